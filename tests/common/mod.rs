#![allow(dead_code)]

use expectation_harness::execute::{ValidationFailure, ValidationReport};
use expectation_harness::{
    DirectorySource, ExpectationSuite, FieldNode, HarnessConfig, ResourceSpace,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        expectation_harness::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

/// Input model used by the integration suites.
#[derive(Debug, Clone, Deserialize)]
pub struct Portfolio {
    pub id: String,
    #[serde(default)]
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub quantity: i64,
}

/// Output model produced by [`summarize`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub position_count: usize,
    pub instruments: Vec<String>,
    pub quantities: Vec<i64>,
    pub net_quantity: i64,
}

/// Report under test: empty portfolios produce nothing.
pub fn summarize(portfolio: &Portfolio) -> anyhow::Result<Option<Summary>> {
    if portfolio.positions.is_empty() {
        return Ok(None);
    }
    anyhow::ensure!(
        portfolio.positions.iter().all(|p| !p.instrument.is_empty()),
        "position without instrument in {}",
        portfolio.id
    );
    Ok(Some(Summary {
        id: portfolio.id.clone(),
        position_count: portfolio.positions.len(),
        instruments: portfolio
            .positions
            .iter()
            .map(|p| p.instrument.clone())
            .collect(),
        quantities: portfolio.positions.iter().map(|p| p.quantity).collect(),
        net_quantity: portfolio.positions.iter().map(|p| p.quantity).sum(),
    }))
}

pub fn tabulate(summary: &Summary) -> Vec<FieldNode> {
    vec![FieldNode::group(
        "summary",
        vec![
            FieldNode::leaf("id", summary.id.clone()),
            FieldNode::leaf("positions", summary.position_count.to_string()),
            FieldNode::group(
                "instruments",
                summary
                    .instruments
                    .iter()
                    .enumerate()
                    .map(|(i, name)| FieldNode::leaf(i.to_string(), name.clone()))
                    .collect(),
            ),
            FieldNode::empty("comment"),
        ],
    )]
}

/// One failure per position with a zero quantity.
pub fn validate(summary: &Summary) -> ValidationReport {
    let failures = summary
        .quantities
        .iter()
        .enumerate()
        .filter(|(_, quantity)| **quantity == 0)
        .map(|(i, _)| ValidationFailure::new(format!("quantities[{i}]"), "must not be zero"))
        .collect();
    ValidationReport::new(failures)
}

/// Scratch expectation tree on disk.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, logical: &str) -> PathBuf {
        self.root().join(logical)
    }

    pub fn write(&self, logical: &str, contents: &str) {
        let path = self.path(logical);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write fixture");
    }

    pub fn read(&self, logical: &str) -> String {
        fs::read_to_string(self.path(logical)).expect("read file")
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            root: "packs".to_string(),
            resource_roots: vec![self.root().to_path_buf()],
            write_root: self.root().to_path_buf(),
            ..HarnessConfig::default()
        }
    }

    pub fn space(&self) -> Arc<ResourceSpace> {
        Arc::new(ResourceSpace::new().with_source(DirectorySource::named("ws", self.root())))
    }

    pub fn suite(&self) -> ExpectationSuite<Portfolio, Summary> {
        self.suite_with(self.config())
    }

    pub fn suite_with(&self, config: HarnessConfig) -> ExpectationSuite<Portfolio, Summary> {
        ExpectationSuite::new(config, self.space(), summarize, tabulate, validate)
            .expect("suite construction")
    }
}

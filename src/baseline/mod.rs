//! Baseline regeneration.
//!
//! At teardown every aggregated actual value is written back beneath the
//! write root, at the logical path its expectation was read from, and each
//! descriptor is rewritten with the assertion values actually observed.
//! Committing the rewritten tree accepts the new behavior.
//!
//! Output order is deterministic: groups in [`GroupKey`] order, records in
//! descriptor sample order, regardless of the order samples executed in.
//!
//! Each copy of a descriptor is rewritten from its own records only. When two
//! copies target the same logical path, the first copy written keeps it.

use crate::aggregate::{GroupResults, OriginResults};
use crate::error::{HarnessError, Result};
use crate::model::GroupKey;
use crate::util::confined_join;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a teardown did, or would have done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSummary {
    /// Files rewritten, in write order.
    pub written: Vec<PathBuf>,
    /// Files that differ but were left alone because rewriting is disabled.
    pub would_write: Vec<PathBuf>,
    /// Files already holding the actual content.
    pub unchanged: usize,
    /// Records with no report location, or not matching their descriptor.
    pub skipped: usize,
    /// Files left to an earlier descriptor copy with the same logical path.
    #[serde(default)]
    pub shadowed: usize,
}

impl BaselineSummary {
    /// True when no baseline file differs from what was observed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.written.is_empty() && self.would_write.is_empty()
    }
}

/// Writes aggregated actual values back to the expectation store.
#[derive(Debug, Clone)]
pub struct BaselineWriter {
    write_root: PathBuf,
    rewrite: bool,
}

impl BaselineWriter {
    #[must_use]
    pub fn new(write_root: impl Into<PathBuf>) -> Self {
        Self {
            write_root: write_root.into(),
            rewrite: true,
        }
    }

    /// Report differences without touching any file.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.rewrite = false;
        self
    }

    #[must_use]
    pub const fn with_rewrite(mut self, rewrite: bool) -> Self {
        self.rewrite = rewrite;
        self
    }

    #[must_use]
    pub fn write_root(&self) -> &Path {
        &self.write_root
    }

    /// Write every group's actual values and its updated descriptor.
    ///
    /// # Errors
    ///
    /// Returns `BaselineWrite` if a file cannot be written, or
    /// `InvalidResourcePath` if a logical path escapes the write root.
    pub fn write(&self, groups: BTreeMap<GroupKey, GroupResults>) -> Result<BaselineSummary> {
        let mut summary = BaselineSummary::default();
        let mut claimed = BTreeSet::new();

        for (key, group) in groups {
            for origin in group.origins {
                let files = Self::plan_origin(&key, origin, &mut summary)?;
                let mut touched = Vec::with_capacity(files.len());
                for (logical, contents) in files {
                    if claimed.contains(&logical) {
                        warn!(group = %key, path = %logical, "Baseline already written from another descriptor copy");
                        summary.shadowed += 1;
                        continue;
                    }
                    self.put(&logical, &contents, &mut summary)?;
                    touched.push(logical);
                }
                claimed.extend(touched);
            }
        }

        info!(
            written = summary.written.len(),
            pending = summary.would_write.len(),
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            shadowed = summary.shadowed,
            "Baseline teardown complete"
        );
        Ok(summary)
    }

    /// Files one descriptor copy wants written, in write order.
    fn plan_origin(
        key: &GroupKey,
        origin: OriginResults,
        summary: &mut BaselineSummary,
    ) -> Result<Vec<(String, String)>> {
        let OriginResults {
            location,
            descriptor,
            mut records,
        } = origin;
        records.sort_by_key(|record| record.sample_index);
        debug!(group = %key, origin = %location, records = records.len(), "Writing baselines");

        let mut updated = (*descriptor).clone();
        let mut files = Vec::with_capacity(records.len() * 2 + 1);
        for record in &records {
            let Some(sample) = updated
                .samples
                .get_mut(record.sample_index)
                .filter(|sample| sample.input_path == record.input_path)
            else {
                warn!(
                    origin = %location,
                    input = %record.input_path,
                    index = record.sample_index,
                    "Record does not match its descriptor sample"
                );
                summary.skipped += 1;
                continue;
            };
            sample.assertions = record.observed_assertions();
            match &record.report_path {
                Some(path) => {
                    if sample.output_path.is_none() {
                        sample.output_path = Some(path.clone());
                    }
                    files.push((path.clone(), record.report.actual.clone()));
                }
                None => summary.skipped += 1,
            }
            if let (Some(path), Some(key_value)) = (&record.key_value_path, &record.key_value) {
                files.push((path.clone(), key_value.actual.clone()));
            }
        }

        files.push((location.path, updated.to_baseline_json()?));
        Ok(files)
    }

    fn put(&self, logical: &str, contents: &str, summary: &mut BaselineSummary) -> Result<()> {
        let path = confined_join(&self.write_root, logical)?;
        match fs::read(&path) {
            Ok(existing) if existing == contents.as_bytes() => {
                summary.unchanged += 1;
                return Ok(());
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(HarnessError::BaselineWrite { path, source }),
        }

        if self.rewrite {
            write_atomic(&path, contents.as_bytes())
                .map_err(|source| HarnessError::BaselineWrite {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "Baseline rewritten");
            summary.written.push(path);
        } else {
            info!(path = %path.display(), "Baseline differs (rewrite disabled)");
            summary.would_write.push(path);
        }
        Ok(())
    }
}

/// Write through a sibling temp file, then rename over the target.
///
/// The temp file is removed again if any step fails.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let result = write_then_rename(&temp_path, path, contents);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, path)
}

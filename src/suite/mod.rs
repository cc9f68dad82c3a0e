//! Suite lifecycle.
//!
//! An [`ExpectationSuite`] frames one run: `setup()`, any number of
//! `run_case()` calls (possibly from several threads), then `teardown()`,
//! which regenerates baselines from everything recorded in between.
//! [`ExpectationSuite::run_all`] drives the whole cycle and returns a
//! serializable [`SuiteReport`].

use crate::aggregate::ResultAggregator;
use crate::baseline::{BaselineSummary, BaselineWriter};
use crate::config::HarnessConfig;
use crate::discover::{CaseGenerator, Cases, TestCase};
use crate::error::{HarnessError, Result, StructuredError};
use crate::execute::{
    Execution, Orchestrator, ReferenceResolver, ReportFunction, SchemaValidator, Tabulator,
    TypeValidator,
};
use crate::resource::ResourceSpace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a passing case passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Output produced and every comparison matched.
    Passed,
    /// Nothing produced, nothing expected.
    ExpectedEmpty,
    /// The report raised as the sample records it should.
    ExpectedRuntimeError,
}

/// Outcome of one case inside a [`SuiteReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    ExpectedEmpty,
    ExpectedRuntimeError,
    /// Actual values differ from the recorded expectations.
    Failed,
    /// The case could not be carried out.
    Errored,
}

impl From<CaseOutcome> for CaseStatus {
    fn from(outcome: CaseOutcome) -> Self {
        match outcome {
            CaseOutcome::Passed => Self::Passed,
            CaseOutcome::ExpectedEmpty => Self::ExpectedEmpty,
            CaseOutcome::ExpectedRuntimeError => Self::ExpectedRuntimeError,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub group: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuredError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteCounts {
    pub total: usize,
    pub passed: usize,
    pub expected_empty: usize,
    pub expected_runtime_error: usize,
    pub failed: usize,
    pub errored: usize,
}

impl SuiteCounts {
    fn add(&mut self, status: CaseStatus) {
        self.total += 1;
        match status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::ExpectedEmpty => self.expected_empty += 1,
            CaseStatus::ExpectedRuntimeError => self.expected_runtime_error += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Errored => self.errored += 1,
        }
    }
}

/// Result of [`ExpectationSuite::run_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub counts: SuiteCounts,
    pub baseline: BaselineSummary,
    /// Teardown failure; case results above are still valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_error: Option<StructuredError>,
}

impl SuiteReport {
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.counts.failed == 0 && self.counts.errored == 0 && self.baseline_error.is_none()
    }

    /// Failed and errored cases only.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(|case| matches!(case.status, CaseStatus::Failed | CaseStatus::Errored))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Discovers, executes and re-baselines the samples of one report function.
#[derive(Debug)]
pub struct ExpectationSuite<I, O> {
    config: HarnessConfig,
    space: Arc<ResourceSpace>,
    generator: CaseGenerator,
    orchestrator: Orchestrator<I, O>,
    aggregator: ResultAggregator,
    writer: BaselineWriter,
}

impl<I, O> ExpectationSuite<I, O>
where
    I: DeserializeOwned,
    O: Serialize,
{
    /// Suite over an explicit resource space.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured descriptor pattern is invalid.
    pub fn new(
        config: HarnessConfig,
        space: Arc<ResourceSpace>,
        function: impl ReportFunction<I, O> + 'static,
        tabulator: impl Tabulator<O> + 'static,
        validator: impl TypeValidator<O> + 'static,
    ) -> Result<Self> {
        let generator = CaseGenerator::from_space(
            Arc::clone(&space),
            config.root.clone(),
            config.descriptor_pattern.as_deref(),
        )?;
        let orchestrator = Orchestrator::new(Arc::clone(&space), function, tabulator, validator);
        let writer =
            BaselineWriter::new(config.write_root.clone()).with_rewrite(config.rewrite_baselines);
        Ok(Self {
            config,
            space,
            generator,
            orchestrator,
            aggregator: ResultAggregator::new(),
            writer,
        })
    }

    /// Suite over the directories named by `config.resource_roots`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured descriptor pattern is invalid.
    pub fn from_config(
        config: HarnessConfig,
        function: impl ReportFunction<I, O> + 'static,
        tabulator: impl Tabulator<O> + 'static,
        validator: impl TypeValidator<O> + 'static,
    ) -> Result<Self> {
        let space = Arc::new(config.resource_space());
        Self::new(config, space, function, tabulator, validator)
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ReferenceResolver<I> + 'static) -> Self {
        self.orchestrator = self.orchestrator.with_resolver(resolver);
        self
    }

    #[must_use]
    pub fn with_schema_validator(mut self, validator: impl SchemaValidator<O> + 'static) -> Self {
        self.orchestrator = self.orchestrator.with_schema_validator(validator);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Start a suite run, discarding anything a previous run left behind.
    pub fn setup(&self) {
        let stale = self.aggregator.take();
        if !stale.is_empty() {
            warn!(groups = stale.len(), "Discarding results from an unfinished run");
        }
        info!(
            root = %self.config.root,
            write_root = %self.config.write_root.display(),
            rewrite = self.config.rewrite_baselines,
            "Expectation suite setup"
        );
    }

    /// Lazily enumerate this suite's test cases.
    #[must_use]
    pub fn cases(&self) -> Cases<'_> {
        self.generator.discover()
    }

    /// Execute one case, record it, then assert.
    ///
    /// The record is aggregated before any assertion, so failing cases still
    /// feed baseline regeneration.
    ///
    /// # Errors
    ///
    /// Returns `Assertion` carrying every mismatch, or the execution error.
    pub fn run_case(&self, case: &TestCase) -> Result<CaseOutcome> {
        let record = match self.orchestrator.execute(case)? {
            Execution::ExpectedEmpty => return Ok(CaseOutcome::ExpectedEmpty),
            Execution::ExpectedRuntimeError => return Ok(CaseOutcome::ExpectedRuntimeError),
            Execution::Recorded(record) => record,
        };

        let mismatches = record.mismatches();
        let input = record.input_path.clone();
        self.aggregator.record(
            case.group.clone(),
            &case.descriptor_location,
            &case.descriptor,
            record,
        );

        if mismatches.is_empty() {
            debug!(case = %case.display_name, "Case passed");
            Ok(CaseOutcome::Passed)
        } else {
            Err(HarnessError::Assertion { input, mismatches })
        }
    }

    /// Write baselines from every recorded result.
    ///
    /// # Errors
    ///
    /// Returns an error if a baseline file cannot be written.
    pub fn teardown(&self) -> Result<BaselineSummary> {
        let mut groups = self.aggregator.take();
        // Copies of a pack are written in container read order, whatever
        // order their cases ran in.
        for group in groups.values_mut() {
            group.origins.sort_by_key(|origin| {
                self.space
                    .source_rank(&origin.location.source)
                    .unwrap_or(usize::MAX)
            });
        }
        info!(groups = groups.len(), "Expectation suite teardown");
        self.writer.write(groups)
    }

    /// Run setup, every discovered case, and teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails. Per-case failures and teardown
    /// failures are reported in the returned [`SuiteReport`].
    pub fn run_all(&self) -> Result<SuiteReport> {
        self.setup();
        let cases = self.generator.collect_cases()?;
        info!(cases = cases.len(), "Running expectation cases");

        let mut counts = SuiteCounts::default();
        let mut reports = Vec::with_capacity(cases.len());
        for case in &cases {
            let (status, error) = match self.run_case(case) {
                Ok(outcome) => (CaseStatus::from(outcome), None),
                Err(err) => {
                    warn!(case = %case.display_name, "{err}");
                    let status = if matches!(err, HarnessError::Assertion { .. }) {
                        CaseStatus::Failed
                    } else {
                        CaseStatus::Errored
                    };
                    (status, Some(StructuredError::from_error(&err)))
                }
            };
            counts.add(status);
            reports.push(CaseReport {
                name: case.display_name.clone(),
                group: case.group.to_string(),
                status,
                error,
            });
        }

        let (baseline, baseline_error) = match self.teardown() {
            Ok(summary) => (summary, None),
            Err(err) => {
                error!(failed = counts.failed, "Baseline teardown failed: {err}");
                (
                    BaselineSummary::default(),
                    Some(StructuredError::from_error(&err)),
                )
            }
        };
        info!(
            total = counts.total,
            passed = counts.passed,
            failed = counts.failed,
            errored = counts.errored,
            "Expectation suite finished"
        );
        Ok(SuiteReport {
            cases: reports,
            counts,
            baseline,
            baseline_error,
        })
    }
}

//! Execution orchestrator.
//!
//! Runs one discovered sample end to end: parse the input, resolve its
//! references, evaluate the report function, tabulate and validate the
//! output, and pair every observation with its recorded expectation.
//!
//! The tabulated projection is always computed; it is only compared when the
//! sample names an `outputTabulatedPath` to compare it against.

mod collaborators;

pub use collaborators::{
    NoReferences, NoValidation, ReferenceResolver, ReportFunction, SchemaValidator, Tabulator,
    TypeValidator, ValidationFailure, ValidationReport,
};

use crate::compare::{compare, is_empty_expectation};
use crate::discover::TestCase;
use crate::error::{HarnessError, Result};
use crate::model::ResultRecord;
use crate::resource::ResourceSpace;
use crate::tabulate::{flatten, render_key_values};
use crate::util::derived_output_path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Location shown for expectations the descriptor does not name.
const UNRECORDED: &str = "<unrecorded>";

/// What happened to one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// Nothing was produced and nothing was expected.
    ExpectedEmpty,
    /// The report raised, and the sample records that it should.
    ExpectedRuntimeError,
    /// Output was produced and compared.
    Recorded(ResultRecord),
}

/// Collaborators needed to execute samples of input type `I` and output type `O`.
pub struct Orchestrator<I, O> {
    space: Arc<ResourceSpace>,
    function: Box<dyn ReportFunction<I, O>>,
    tabulator: Box<dyn Tabulator<O>>,
    validator: Box<dyn TypeValidator<O>>,
    resolver: Box<dyn ReferenceResolver<I>>,
    schema_validator: Option<Box<dyn SchemaValidator<O>>>,
}

impl<I, O> std::fmt::Debug for Orchestrator<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("space", &self.space)
            .field("schema_validator", &self.schema_validator.is_some())
            .finish_non_exhaustive()
    }
}

impl<I, O> Orchestrator<I, O>
where
    I: DeserializeOwned,
    O: Serialize,
{
    /// Orchestrator with no reference resolution and no schema validation.
    #[must_use]
    pub fn new(
        space: Arc<ResourceSpace>,
        function: impl ReportFunction<I, O> + 'static,
        tabulator: impl Tabulator<O> + 'static,
        validator: impl TypeValidator<O> + 'static,
    ) -> Self {
        Self {
            space,
            function: Box::new(function),
            tabulator: Box::new(tabulator),
            validator: Box::new(validator),
            resolver: Box::new(NoReferences),
            schema_validator: None,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ReferenceResolver<I> + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    #[must_use]
    pub fn with_schema_validator(mut self, validator: impl SchemaValidator<O> + 'static) -> Self {
        self.schema_validator = Some(Box::new(validator));
        self
    }

    /// Execute one sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be parsed or resolved, the report
    /// raises unexpectedly, output is missing although expected, or a
    /// recorded expectation cannot be read.
    pub fn execute(&self, case: &TestCase) -> Result<Execution> {
        let sample = &case.sample;
        let input_name = sample.input_path.as_str();
        debug!(case = %case.display_name, "Executing sample");

        // Resolve references into a private copy, then freeze it.
        let mut working: I = serde_json::from_slice(case.input.bytes()).map_err(|source| {
            HarnessError::InputParse {
                input: input_name.to_string(),
                source,
            }
        })?;
        self.resolver
            .resolve(&mut working)
            .map_err(|source| HarnessError::ReferenceResolution {
                input: input_name.to_string(),
                source,
            })?;
        let input = working;

        let produced = match self.function.evaluate(&input) {
            Ok(produced) => produced,
            Err(source) if sample.assertions.runtime_error => {
                info!(input = input_name, error = %source, "Expected runtime error observed");
                return Ok(Execution::ExpectedRuntimeError);
            }
            Err(source) => {
                return Err(HarnessError::Evaluation {
                    input: input_name.to_string(),
                    source,
                });
            }
        };

        let Some(output) = produced else {
            let (report_location, expected_report) =
                self.read_expected(sample.output_path.as_deref())?;
            if is_empty_expectation(&expected_report) {
                debug!(input = input_name, "Empty result expected and produced");
                return Ok(Execution::ExpectedEmpty);
            }
            return Err(HarnessError::MissingOutput {
                input: input_name.to_string(),
                expected: report_location,
            });
        };

        // Output without a recorded location is compared against, and later
        // written to, a path derived from the input.
        let report_path = sample
            .output_path
            .clone()
            .unwrap_or_else(|| derived_output_path(&sample.input_path));
        let (report_location, expected_report) = self.read_expected(Some(&report_path))?;

        let mut actual_report = serde_json::to_string_pretty(&output)?;
        actual_report.push('\n');

        let schema_errors = self
            .schema_validator
            .as_ref()
            .map(|validator| validator.check(&output, &actual_report))
            .unwrap_or_default();
        for error in &schema_errors {
            warn!(input = input_name, "Schema validation: {error}");
        }

        let rows = flatten(&self.tabulator.tabulate(&output));
        debug!(input = input_name, rows = rows.len(), "Output tabulated");
        let key_value = match sample.output_tabulated_path.as_deref() {
            Some(path) => {
                let actual = render_key_values(&rows)?;
                let (location, expected) = self.read_expected(Some(path))?;
                Some(compare(location, expected, actual))
            }
            None => None,
        };

        let validation = self.validator.validate(&output);
        validation.log_report(input_name);

        let descriptor_location = case.descriptor_location.to_string();
        let record = ResultRecord {
            input_path: sample.input_path.clone(),
            sample_index: case.sample_index,
            report_path: Some(report_path),
            key_value_path: sample.output_tabulated_path.clone(),
            key_value,
            report: compare(report_location, expected_report, actual_report),
            validation_failures: compare(
                descriptor_location.clone(),
                sample.assertions.model_validation_failures,
                validation.failure_count(),
            ),
            schema_validation_failure: compare(
                descriptor_location.clone(),
                sample.assertions.schema_validation_failure,
                !schema_errors.is_empty(),
            ),
            runtime_error: compare(descriptor_location, sample.assertions.runtime_error, false),
        };
        Ok(Execution::Recorded(record))
    }

    /// Recorded text behind a logical path; empty when unnamed or missing.
    fn read_expected(&self, path: Option<&str>) -> Result<(String, String)> {
        let Some(path) = path else {
            return Ok((UNRECORDED.to_string(), String::new()));
        };
        match self.space.resolve(path)? {
            Some(resource) => Ok((resource.location.to_string(), resource.text()?.to_string())),
            None => {
                debug!(path, "Expectation file not found, treating as empty");
                Ok((path.to_string(), String::new()))
            }
        }
    }
}

//! Interfaces of the external collaborators driven by the orchestrator.
//!
//! Report functions and tabulators are usually closures; validators and
//! resolvers are usually types owned by the model runtime. Every collaborator
//! is `Send + Sync` so one suite can serve parallel test threads.

use crate::tabulate::FieldNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// The report/transform under test.
pub trait ReportFunction<I, O>: Send + Sync {
    /// Produce the output model, `Ok(None)` for an empty result.
    ///
    /// # Errors
    ///
    /// Any error is a defect in the report, surfaced as a test failure.
    fn evaluate(&self, input: &I) -> anyhow::Result<Option<O>>;
}

impl<I, O, F> ReportFunction<I, O> for F
where
    F: Fn(&I) -> anyhow::Result<Option<O>> + Send + Sync,
{
    fn evaluate(&self, input: &I) -> anyhow::Result<Option<O>> {
        self(input)
    }
}

/// Projects an output model onto a tree of named fields.
pub trait Tabulator<O>: Send + Sync {
    fn tabulate(&self, output: &O) -> Vec<FieldNode>;
}

impl<O, F> Tabulator<O> for F
where
    F: Fn(&O) -> Vec<FieldNode> + Send + Sync,
{
    fn tabulate(&self, output: &O) -> Vec<FieldNode> {
        self(output)
    }
}

/// Counts structural validation failures of an output model.
pub trait TypeValidator<O>: Send + Sync {
    fn validate(&self, output: &O) -> ValidationReport;
}

impl<O, F> TypeValidator<O> for F
where
    F: Fn(&O) -> ValidationReport + Send + Sync,
{
    fn validate(&self, output: &O) -> ValidationReport {
        self(output)
    }
}

/// Resolves intra-document references in place before evaluation.
pub trait ReferenceResolver<I>: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if a reference cannot be resolved.
    fn resolve(&self, input: &mut I) -> anyhow::Result<()>;
}

/// Checks the serialized output against its schema.
pub trait SchemaValidator<O>: Send + Sync {
    /// Schema violations; empty when the output conforms.
    fn check(&self, output: &O, serialized: &str) -> Vec<String>;
}

/// Validator for outputs that carry no validation rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl<O> TypeValidator<O> for NoValidation {
    fn validate(&self, _output: &O) -> ValidationReport {
        ValidationReport::default()
    }
}

/// Resolver for inputs without cross-references.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

impl<I> ReferenceResolver<I> for NoReferences {
    fn resolve(&self, _input: &mut I) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Path of the offending field.
    pub path: String,
    /// Why validation failed.
    pub message: String,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result of validating one output model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    #[must_use]
    pub const fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    #[must_use]
    pub fn failure_count(&self) -> u32 {
        u32::try_from(self.failures.len()).unwrap_or(u32::MAX)
    }

    /// Log the report for the given input.
    pub fn log_report(&self, input: &str) {
        if self.failures.is_empty() {
            debug!(input, "Validation passed");
            return;
        }
        info!(input, failures = self.failures.len(), "Validation failures");
        for failure in &self.failures {
            debug!(input, path = %failure.path, "{}", failure.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_collaborators() {
        let function = |input: &u32| -> anyhow::Result<Option<u32>> { Ok(Some(input * 2)) };
        assert_eq!(function.evaluate(&21).unwrap(), Some(42));

        let tabulator = |output: &u32| vec![FieldNode::leaf("value", output.to_string())];
        assert_eq!(tabulator.tabulate(&7), vec![FieldNode::leaf("value", "7")]);

        let validator = |output: &u32| {
            ValidationReport::new(if *output > 10 {
                vec![ValidationFailure::new("value", "too large")]
            } else {
                Vec::new()
            })
        };
        assert_eq!(validator.validate(&11).failure_count(), 1);
        assert_eq!(validator.validate(&1).failure_count(), 0);
    }

    #[test]
    fn test_noop_collaborators() {
        let mut input = 5_u32;
        ReferenceResolver::resolve(&NoReferences, &mut input).unwrap();
        assert_eq!(input, 5);
        assert_eq!(TypeValidator::<u32>::validate(&NoValidation, &5).failure_count(), 0);
    }

    #[test]
    fn test_validation_failure_display() {
        let failure = ValidationFailure::new("trade.price", "must be positive");
        assert_eq!(failure.to_string(), "trade.price: must be positive");
    }
}

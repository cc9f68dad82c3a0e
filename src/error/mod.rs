//! Error types and handling for `expectation_harness`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Collaborator failures arrive as `anyhow::Error` and are wrapped with context
//! - A missing input resource is never an error; the input resolver reports it
//!   as an absent value instead
//! - Provides structured JSON output for suite reports

mod structured;

pub use structured::{ErrorCode, StructuredError};

use crate::compare::Mismatch;
use crate::resource::ResourceLocation;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `expectation_harness` operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    // === Discovery Errors ===
    /// An expectation-set descriptor could not be parsed.
    #[error("Malformed expectation descriptor at '{location}': {source}")]
    DescriptorParse {
        location: ResourceLocation,
        #[source]
        source: serde_json::Error,
    },

    /// A resource path escapes its container or is otherwise unusable.
    #[error("Invalid resource path '{path}': {reason}")]
    InvalidResourcePath { path: String, reason: String },

    /// Filename filter is not a valid regular expression.
    #[error("Invalid descriptor pattern: {0}")]
    Pattern(#[from] regex::Error),

    // === Sample Errors ===
    /// The resolved input resource could not be deserialized.
    #[error("Cannot parse input '{input}': {source}")]
    InputParse {
        input: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reference resolution failed before evaluation.
    #[error("Reference resolution failed for '{input}': {source}")]
    ReferenceResolution {
        input: String,
        #[source]
        source: anyhow::Error,
    },

    /// The report function raised an error.
    #[error("Report evaluation failed for '{input}': {source}")]
    Evaluation {
        input: String,
        #[source]
        source: anyhow::Error,
    },

    /// The report function produced nothing although an output was expected.
    #[error("No output produced for '{input}' but '{expected}' expects one")]
    MissingOutput { input: String, expected: String },

    /// A recorded expectation is not valid UTF-8 text.
    #[error("Expectation '{location}' is not valid UTF-8: {source}")]
    ExpectationEncoding {
        location: ResourceLocation,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Actual values differ from the recorded expectations.
    #[error("{}", format_mismatches(.input, .mismatches))]
    Assertion {
        input: String,
        mismatches: Vec<Mismatch>,
    },

    // === Baseline Errors ===
    /// Writing a regenerated baseline failed.
    #[error("Failed to write baseline '{}': {source}", path.display())]
    BaselineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_mismatches(input: &str, mismatches: &[Mismatch]) -> String {
    let mut message = format!("Expectation mismatch for '{input}'");
    for mismatch in mismatches {
        message.push_str("\n  ");
        message.push_str(&mismatch.to_string());
    }
    message
}

impl HarnessError {
    /// Is this a per-sample test failure (as opposed to an infrastructure error)?
    #[must_use]
    pub const fn is_sample_failure(&self) -> bool {
        matches!(
            self,
            Self::InputParse { .. }
                | Self::ReferenceResolution { .. }
                | Self::Evaluation { .. }
                | Self::MissingOutput { .. }
                | Self::ExpectationEncoding { .. }
                | Self::Assertion { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DescriptorParse { .. } => {
                Some("Fix or regenerate the descriptor file; it is not valid JSON for a test pack")
            }
            Self::Assertion { .. } => {
                Some("Review the diff; accept it by committing the rewritten baseline files")
            }
            Self::MissingOutput { .. } => {
                Some("Remove outputPath from the sample if an empty result is expected")
            }
            Self::InvalidResourcePath { .. } => {
                Some("Use relative paths without '..' components")
            }
            Self::Pattern(_) => Some("Check the descriptor-pattern regular expression"),
            Self::ExpectationEncoding { .. } => {
                Some("Re-save the expectation file as UTF-8 or delete it to regenerate")
            }
            _ => None,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type using `HarnessError`.
pub type Result<T> = std::result::Result<T, HarnessError>;

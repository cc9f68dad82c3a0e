//! Structured error output for suite reports.
//!
//! Provides machine-parseable error information with:
//! - Stable error codes for categorization
//! - Hints for self-correction
//! - Mismatch details for assertion failures

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Discovery ===
    /// Descriptor file is not valid JSON for a test pack
    DescriptorParse,
    /// Resource path escapes its container
    InvalidResourcePath,
    /// Descriptor filename pattern is invalid
    InvalidPattern,

    // === Sample ===
    /// Input resource could not be deserialized
    InputParse,
    /// Reference resolution failed
    ReferenceResolution,
    /// Report function raised an error
    EvaluationFailed,
    /// Report function produced no output
    MissingOutput,
    /// Recorded expectation is not UTF-8
    ExpectationEncoding,
    /// Actual values differ from expectations
    AssertionFailed,

    // === Teardown ===
    /// Baseline file could not be written
    BaselineWrite,

    // === Ambient ===
    /// Configuration error
    ConfigError,
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DescriptorParse => "DESCRIPTOR_PARSE",
            Self::InvalidResourcePath => "INVALID_RESOURCE_PATH",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InputParse => "INPUT_PARSE",
            Self::ReferenceResolution => "REFERENCE_RESOLUTION",
            Self::EvaluationFailed => "EVALUATION_FAILED",
            Self::MissingOutput => "MISSING_OUTPUT",
            Self::ExpectationEncoding => "EXPECTATION_ENCODING",
            Self::AssertionFailed => "ASSERTION_FAILED",
            Self::BaselineWrite => "BASELINE_WRITE",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
        }
    }

    /// Classify a harness error.
    #[must_use]
    pub const fn from_error(err: &HarnessError) -> Self {
        match err {
            HarnessError::DescriptorParse { .. } => Self::DescriptorParse,
            HarnessError::InvalidResourcePath { .. } => Self::InvalidResourcePath,
            HarnessError::Pattern(_) => Self::InvalidPattern,
            HarnessError::InputParse { .. } => Self::InputParse,
            HarnessError::ReferenceResolution { .. } => Self::ReferenceResolution,
            HarnessError::Evaluation { .. } => Self::EvaluationFailed,
            HarnessError::MissingOutput { .. } => Self::MissingOutput,
            HarnessError::ExpectationEncoding { .. } => Self::ExpectationEncoding,
            HarnessError::Assertion { .. } => Self::AssertionFailed,
            HarnessError::BaselineWrite { .. } => Self::BaselineWrite,
            HarnessError::Config(_) => Self::ConfigError,
            HarnessError::Io(_) => Self::IoError,
            HarnessError::Json(_) => Self::JsonError,
            HarnessError::Yaml(_) => Self::YamlError,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable view of a `HarnessError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mismatches: Vec<Value>,
}

impl StructuredError {
    #[must_use]
    pub fn from_error(err: &HarnessError) -> Self {
        let mismatches = match err {
            HarnessError::Assertion { mismatches, .. } => mismatches
                .iter()
                .map(|m| {
                    json!({
                        "field": m.field,
                        "location": m.location,
                        "expected": m.expected,
                        "actual": m.actual,
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            code: ErrorCode::from_error(err),
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            mismatches,
        }
    }

    /// Render as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "code": self.code.as_str(),
            "message": self.message,
        });
        if let Some(hint) = &self.hint {
            value["hint"] = json!(hint);
        }
        if !self.mismatches.is_empty() {
            value["mismatches"] = Value::Array(self.mismatches.clone());
        }
        value
    }
}

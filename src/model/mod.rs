//! Core data types for `expectation_harness`.
//!
//! This module defines the fundamental types used throughout the crate:
//! - `ExpectationSetDescriptor` - One recorded dataset (a test pack)
//! - `SampleDescriptor` - One input/expectation pairing inside a test pack
//! - `AssertionSpec` - Expected validation, schema and runtime outcomes
//! - `GroupKey` - Identity used to bucket results for baseline regeneration
//! - `ExpectedAndActual` - A compared value pair
//! - `ResultRecord` - Everything observed for one executed sample

use crate::compare::{Comparable, Mismatch};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field dropped from rewritten descriptors; it only describes how the pack
/// was generated.
pub const EXPECTED_TYPE_FIELD: &str = "expectedType";

/// Expected outcomes of running one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssertionSpec {
    /// Number of model validation failures the report output carries.
    #[serde(default)]
    pub model_validation_failures: u32,
    /// Whether the serialized output fails schema validation.
    #[serde(default)]
    pub schema_validation_failure: bool,
    /// Whether the report function is expected to raise.
    #[serde(default)]
    pub runtime_error: bool,
}

/// One input/output pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SampleDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Logical path of the input resource.
    pub input_path: String,
    /// Logical path of the expected report output. Absent when nothing is
    /// expected; produced output then goes to a path derived from the input
    /// and is recorded here on rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Logical path of the expected tabulated key-value projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tabulated_path: Option<String>,
    #[serde(default)]
    pub assertions: AssertionSpec,
}

impl SampleDescriptor {
    #[must_use]
    pub fn new(input_path: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            input_path: input_path.into(),
            output_path: None,
            output_tabulated_path: None,
            assertions: AssertionSpec::default(),
        }
    }

    #[must_use]
    pub fn with_output(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_tabulated_output(mut self, path: impl Into<String>) -> Self {
        self.output_tabulated_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_assertions(mut self, assertions: AssertionSpec) -> Self {
        self.assertions = assertions;
        self
    }

    /// True when the descriptor records that no output exists for this input.
    #[must_use]
    pub const fn expects_upstream_failure(&self) -> bool {
        self.output_path.is_none()
    }
}

/// One logical dataset with its ordered samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationSetDescriptor {
    /// Test-pack identity.
    pub id: String,
    /// Pipeline (report or transform) the pack exercises.
    pub pipeline_id: String,
    /// Dataset name.
    pub name: String,
    #[serde(default)]
    pub samples: Vec<SampleDescriptor>,
    /// Fields this crate does not interpret; kept so rewrites are lossless.
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, Value>,
}

impl ExpectationSetDescriptor {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        pipeline_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pipeline_id: pipeline_id.into(),
            name: name.into(),
            samples: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_sample(mut self, sample: SampleDescriptor) -> Self {
        self.samples.push(sample);
        self
    }

    #[must_use]
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.id, &self.pipeline_id, &self.name)
    }

    /// Serialize for writing back to the store, without generation-only fields.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_baseline_json(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove(EXPECTED_TYPE_FIELD);
        }
        let mut rendered = serde_json::to_string_pretty(&value)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// JSON schema of the descriptor file format.
#[must_use]
pub fn descriptor_schema() -> Value {
    let schema = schemars::schema_for!(ExpectationSetDescriptor);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// Composite identity used to bucket results.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub pack_id: String,
    pub pipeline_id: String,
    pub dataset_name: String,
}

impl GroupKey {
    #[must_use]
    pub fn new(pack_id: &str, pipeline_id: &str, dataset_name: &str) -> Self {
        Self {
            pack_id: pack_id.to_string(),
            pipeline_id: pipeline_id.to_string(),
            dataset_name: dataset_name.to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.pack_id, self.pipeline_id, self.dataset_name
        )
    }
}

/// An expected value, the actual value, and where the expected one came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedAndActual<V> {
    pub location: String,
    pub expected: V,
    pub actual: V,
}

impl<V: Comparable> ExpectedAndActual<V> {
    /// Equality verdict after normalization.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.expected.equivalent(&self.actual)
    }
}

/// Everything observed while executing one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Input identity.
    pub input_path: String,
    /// Position of the sample in its descriptor.
    pub sample_index: usize,
    /// Where the actual report is written back to, if anywhere.
    pub report_path: Option<String>,
    /// Where the actual key-value projection is written back to, if anywhere.
    pub key_value_path: Option<String>,
    /// Absent when the sample records no tabulated expectation.
    pub key_value: Option<ExpectedAndActual<String>>,
    pub report: ExpectedAndActual<String>,
    pub validation_failures: ExpectedAndActual<u32>,
    pub schema_validation_failure: ExpectedAndActual<bool>,
    pub runtime_error: ExpectedAndActual<bool>,
}

impl ResultRecord {
    /// Every comparison that failed, in a fixed order.
    #[must_use]
    pub fn mismatches(&self) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();
        if let Some(key_value) = &self.key_value {
            mismatches.extend(Mismatch::check("Key-value", key_value));
        }
        mismatches.extend(Mismatch::check("Report", &self.report));
        mismatches.extend(Mismatch::check(
            "Validation failures",
            &self.validation_failures,
        ));
        mismatches.extend(Mismatch::check(
            "Schema validation failure",
            &self.schema_validation_failure,
        ));
        mismatches.extend(Mismatch::check("Runtime error", &self.runtime_error));
        mismatches
    }

    /// Assertion values actually observed, for rewriting the descriptor.
    #[must_use]
    pub const fn observed_assertions(&self) -> AssertionSpec {
        AssertionSpec {
            model_validation_failures: self.validation_failures.actual,
            schema_validation_failure: self.schema_validation_failure.actual,
            runtime_error: self.runtime_error.actual,
        }
    }
}

//! `expectation_harness` - golden-file expectation engine for report functions.
//!
//! Test packs (expectation-set descriptors) name input samples together with
//! their recorded report output, tabulated key-value projection and expected
//! validation outcomes. The harness discovers packs across a stack of resource
//! containers, turns each sample into a named test case, runs the report
//! function under test, compares every observation with its recording, and at
//! teardown writes the observed values back so a changed baseline can be
//! reviewed and committed.
//!
//! ```no_run
//! use expectation_harness::{ExpectationSuite, FieldNode, HarnessConfig, NoValidation};
//! use serde_json::Value;
//!
//! let suite = ExpectationSuite::from_config(
//!     HarnessConfig::default(),
//!     |input: &Value| -> anyhow::Result<Option<Value>> { Ok(Some(input.clone())) },
//!     |_: &Value| -> Vec<FieldNode> { Vec::new() },
//!     NoValidation,
//! )?;
//! let report = suite.run_all()?;
//! assert!(report.all_passed(), "{}", report.to_json());
//! # Ok::<(), expectation_harness::HarnessError>(())
//! ```

pub mod aggregate;
pub mod baseline;
pub mod compare;
pub mod config;
pub mod discover;
pub mod error;
pub mod execute;
pub mod logging;
pub mod model;
pub mod resource;
pub mod store;
pub mod suite;
pub mod tabulate;
pub mod util;

pub use baseline::{BaselineSummary, BaselineWriter};
pub use config::{ConfigOverrides, HarnessConfig};
pub use discover::{CaseGenerator, TestCase};
pub use error::{ErrorCode, HarnessError, Result, StructuredError};
pub use execute::{
    NoReferences, NoValidation, ReferenceResolver, ReportFunction, SchemaValidator, Tabulator,
    TypeValidator, ValidationFailure, ValidationReport,
};
pub use model::{AssertionSpec, ExpectationSetDescriptor, GroupKey, ResultRecord, SampleDescriptor};
pub use resource::{DirectorySource, EmbeddedSource, ResourceLocation, ResourceSource, ResourceSpace};
pub use suite::{CaseOutcome, CaseStatus, ExpectationSuite, SuiteReport};
pub use tabulate::{FieldNode, KeyValue};

//! Input resolution.
//!
//! A sample whose input resource cannot be found is not a failure: some
//! upstream producer did not emit anything for it. The resolver returns
//! `None` and the sample is left out of the generated test cases.

use crate::error::Result;
use crate::model::SampleDescriptor;
use crate::resource::{Resource, ResourceSpace};
use std::sync::Arc;
use tracing::warn;

/// An input resource located for a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub resource: Resource,
}

impl ResolvedInput {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.resource.bytes
    }
}

/// Maps sample input references to resources.
#[derive(Debug, Clone)]
pub struct InputResolver {
    space: Arc<ResourceSpace>,
}

impl InputResolver {
    #[must_use]
    pub const fn new(space: Arc<ResourceSpace>) -> Self {
        Self { space }
    }

    /// Resolve a sample's input. `Ok(None)` when no container has it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the resource exists but cannot be read, or
    /// the path escapes its container.
    pub fn resolve(&self, sample: &SampleDescriptor) -> Result<Option<ResolvedInput>> {
        match self.space.resolve(&sample.input_path)? {
            Some(resource) => Ok(Some(ResolvedInput { resource })),
            None => {
                warn!(
                    input = %sample.input_path,
                    upstream_failure_expected = sample.expects_upstream_failure(),
                    "Input not found, skipping sample"
                );
                Ok(None)
            }
        }
    }
}

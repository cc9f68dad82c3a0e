//! Expectation store: descriptor discovery and loading.
//!
//! Descriptors are found by listing every resource under a root prefix in the
//! resource space and keeping those whose file name matches the descriptor
//! pattern. A descriptor that fails to parse is a fatal discovery error.

mod input;

pub use input::{InputResolver, ResolvedInput};

use crate::error::{HarnessError, Result};
use crate::model::ExpectationSetDescriptor;
use crate::resource::{ResourceLocation, ResourceSpace};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// File names treated as descriptors when no filter is configured.
pub const DEFAULT_DESCRIPTOR_PATTERN: &str = r"^test-pack-.+\.json$";

/// Reads expectation-set descriptors from a resource space.
#[derive(Debug, Clone)]
pub struct ExpectationStore {
    space: Arc<ResourceSpace>,
    pattern: Regex,
}

impl ExpectationStore {
    /// Store using the default descriptor pattern.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in pattern; the `Result` mirrors `with_pattern`.
    pub fn new(space: Arc<ResourceSpace>) -> Result<Self> {
        Self::with_pattern(space, None)
    }

    /// Store with an optional file-name filter (regular expression).
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn with_pattern(space: Arc<ResourceSpace>, pattern: Option<&str>) -> Result<Self> {
        let pattern = Regex::new(pattern.unwrap_or(DEFAULT_DESCRIPTOR_PATTERN))?;
        Ok(Self { space, pattern })
    }

    #[must_use]
    pub fn space(&self) -> &Arc<ResourceSpace> {
        &self.space
    }

    /// Every descriptor location under `root`, across all containers.
    ///
    /// # Errors
    ///
    /// Returns an error if a container cannot be enumerated.
    pub fn descriptor_locations(&self, root: &str) -> Result<Vec<ResourceLocation>> {
        let locations: Vec<_> = self
            .space
            .list_resources(root)?
            .into_iter()
            .filter(|location| self.pattern.is_match(location.file_name()))
            .collect();
        info!(
            root,
            pattern = %self.pattern,
            count = locations.len(),
            "Discovered expectation descriptors"
        );
        Ok(locations)
    }

    /// Load and parse one descriptor.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorParse` if the content is not a valid descriptor, or
    /// `Config` if the location no longer exists.
    pub fn load_descriptor(&self, location: &ResourceLocation) -> Result<ExpectationSetDescriptor> {
        let resource = self.space.read(location)?.ok_or_else(|| {
            HarnessError::config(format!("descriptor '{location}' disappeared during discovery"))
        })?;
        let descriptor: ExpectationSetDescriptor = serde_json::from_slice(&resource.bytes)
            .map_err(|source| HarnessError::DescriptorParse {
                location: location.clone(),
                source,
            })?;
        debug!(
            location = %location,
            group = %descriptor.group_key(),
            samples = descriptor.samples.len(),
            "Loaded descriptor"
        );
        Ok(descriptor)
    }

    /// Discover and load every descriptor under `root`.
    ///
    /// # Errors
    ///
    /// Returns the first discovery or parse error.
    pub fn load_all(&self, root: &str) -> Result<Vec<(ResourceLocation, ExpectationSetDescriptor)>> {
        self.descriptor_locations(root)?
            .into_iter()
            .map(|location| {
                let descriptor = self.load_descriptor(&location)?;
                Ok((location, descriptor))
            })
            .collect()
    }
}

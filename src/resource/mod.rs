//! Resource enumeration over several containers.
//!
//! Expectation files, inputs and recorded outputs are addressed by logical,
//! `/`-separated paths. A [`ResourceSpace`] stacks any number of
//! [`ResourceSource`] containers (directories, embedded manifests) and answers
//! two questions: which resources live under a prefix, and what are the bytes
//! behind a logical path.
//!
//! The same logical path may exist in several containers. Listing returns every
//! match; reading by logical path takes the first container that has it.

mod directory;
mod embedded;

pub use directory::DirectorySource;
pub use embedded::EmbeddedSource;

use crate::error::{HarnessError, Result};
use crate::util::normalize_logical_path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A container of resources addressed by logical path.
pub trait ResourceSource: fmt::Debug + Send + Sync {
    /// Stable name used in diagnostics (`name:path`).
    fn name(&self) -> &str;

    /// List every resource path under `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be enumerated.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read a resource. `Ok(None)` when the container does not hold it.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource exists but cannot be read.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// Where a resource was found.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceLocation {
    /// Name of the container that holds the resource.
    pub source: String,
    /// Logical path inside the container.
    pub path: String,
}

impl ResourceLocation {
    #[must_use]
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: normalize_logical_path(&path.into()),
        }
    }

    /// The final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.path)
    }
}

/// A resource read from some container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub location: ResourceLocation,
    pub bytes: Vec<u8>,
}

impl Resource {
    /// Content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `ExpectationEncoding` if the bytes are not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|source| HarnessError::ExpectationEncoding {
            location: self.location.clone(),
            source,
        })
    }
}

/// Ordered stack of resource containers.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpace {
    sources: Vec<Arc<dyn ResourceSource>>,
}

impl ResourceSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a container; earlier containers win on reads.
    #[must_use]
    pub fn with_source(mut self, source: impl ResourceSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Position of the named container in read order.
    #[must_use]
    pub fn source_rank(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|source| source.name() == name)
    }

    pub fn push(&mut self, source: Arc<dyn ResourceSource>) {
        self.sources.push(source);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Every resource under `prefix` in every container. Duplicates across
    /// containers are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if any container fails to enumerate.
    pub fn list_resources(&self, prefix: &str) -> Result<Vec<ResourceLocation>> {
        let prefix = normalize_logical_path(prefix);
        let mut locations = Vec::new();
        for source in &self.sources {
            let paths = source.list(&prefix)?;
            debug!(source = source.name(), prefix = %prefix, count = paths.len(), "Listed resources");
            locations.extend(
                paths
                    .into_iter()
                    .map(|path| ResourceLocation::new(source.name(), path)),
            );
        }
        Ok(locations)
    }

    /// Resolve a logical path against the containers in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a container holds the resource but reading it fails,
    /// or if the path escapes its container.
    pub fn resolve(&self, path: &str) -> Result<Option<Resource>> {
        let path = normalize_logical_path(path);
        crate::util::validate_logical_path(&path)?;
        for source in &self.sources {
            if let Some(bytes) = source.read(&path)? {
                return Ok(Some(Resource {
                    location: ResourceLocation::new(source.name(), path),
                    bytes,
                }));
            }
        }
        Ok(None)
    }

    /// Read exactly the given location.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn read(&self, location: &ResourceLocation) -> Result<Option<Resource>> {
        for source in self.sources.iter().filter(|s| s.name() == location.source) {
            if let Some(bytes) = source.read(&location.path)? {
                return Ok(Some(Resource {
                    location: location.clone(),
                    bytes,
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ResourceSpace {
        ResourceSpace::new()
            .with_source(
                EmbeddedSource::new("first")
                    .with_file("packs/test-pack-a.json", "{}")
                    .with_file("inputs/a.json", "first"),
            )
            .with_source(
                EmbeddedSource::new("second")
                    .with_file("packs/test-pack-a.json", "{}")
                    .with_file("inputs/a.json", "second")
                    .with_file("inputs/b.json", "only-second"),
            )
    }

    #[test]
    fn test_list_returns_duplicates_across_sources() {
        let locations = space().list_resources("packs").unwrap();
        assert_eq!(
            locations,
            vec![
                ResourceLocation::new("first", "packs/test-pack-a.json"),
                ResourceLocation::new("second", "packs/test-pack-a.json"),
            ]
        );
    }

    #[test]
    fn test_resolve_prefers_earlier_source() {
        let space = space();
        let a = space.resolve("inputs/a.json").unwrap().unwrap();
        assert_eq!(a.text().unwrap(), "first");
        assert_eq!(a.location.source, "first");

        let b = space.resolve("./inputs/b.json").unwrap().unwrap();
        assert_eq!(b.text().unwrap(), "only-second");

        assert!(space.resolve("inputs/missing.json").unwrap().is_none());
    }

    #[test]
    fn test_source_rank_follows_read_order() {
        let space = space();
        assert_eq!(space.source_rank("first"), Some(0));
        assert_eq!(space.source_rank("second"), Some(1));
        assert_eq!(space.source_rank("other"), None);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        assert!(space().resolve("../secret.json").is_err());
    }

    #[test]
    fn test_read_exact_location() {
        let space = space();
        let location = ResourceLocation::new("second", "inputs/a.json");
        assert_eq!(space.read(&location).unwrap().unwrap().text().unwrap(), "second");
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let space = ResourceSpace::new()
            .with_source(EmbeddedSource::new("mem").with_file("outputs/a.json", vec![b'{', 0xff, b'}']));
        let resource = space.resolve("outputs/a.json").unwrap().unwrap();
        let err = resource.text().unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ExpectationEncoding { ref location, .. } if location.path == "outputs/a.json"
        ));
        assert!(err.is_sample_failure());
    }

    #[test]
    fn test_location_display_and_file_name() {
        let location = ResourceLocation::new("fs", "./packs/test-pack-a.json");
        assert_eq!(location.to_string(), "fs:packs/test-pack-a.json");
        assert_eq!(location.file_name(), "test-pack-a.json");
    }
}

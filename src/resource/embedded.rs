//! In-memory resource manifest.

use super::ResourceSource;
use crate::error::Result;
use crate::util::normalize_logical_path;
use std::collections::BTreeMap;

/// Resources compiled into the binary or assembled in memory.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl EmbeddedSource {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .insert(normalize_logical_path(path), contents.into());
    }
}

impl ResourceSource for EmbeddedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_logical_path(prefix);
        Ok(self
            .files
            .keys()
            .filter(|path| is_under(path, &prefix))
            .cloned()
            .collect())
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(&normalize_logical_path(path)).cloned())
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    let prefix = prefix.trim_end_matches('/');
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

//! Filesystem directory as a resource container.

use super::ResourceSource;
use crate::error::Result;
use crate::util::{confined_join, normalize_logical_path};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Resources stored beneath a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    root: PathBuf,
}

impl DirectorySource {
    /// Name the container after its root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: root.display().to_string(),
            root,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_logical_path(prefix);
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            confined_join(&self.root, &prefix)?
        };

        if !start.exists() {
            debug!(path = %start.display(), "Resource prefix absent in directory");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&start)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("walking {}: {e}", start.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let logical = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                paths.push(logical);
            }
        }
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = confined_join(&self.root, path)?;
        match fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if full.is_dir() => {
                debug!(path = %full.display(), error = %e, "Resource is a directory");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

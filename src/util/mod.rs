//! Shared utilities for `expectation_harness`.
//!
//! Common functionality used across modules:
//! - Logical resource path normalization and confinement
//! - Input file name processing for display names

use crate::error::{HarnessError, Result};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Normalize a logical resource path: forward slashes, no leading `./` or `/`.
#[must_use]
pub fn normalize_logical_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed.to_string()
}

/// Reject logical paths that would escape their container.
///
/// # Errors
///
/// Returns `InvalidResourcePath` for empty paths or paths with `..` components.
pub fn validate_logical_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(HarnessError::InvalidResourcePath {
            path: path.to_string(),
            reason: "path is empty".to_string(),
        });
    }

    for component in Path::new(path).components() {
        match component {
            Component::ParentDir => {
                warn!(path, "Resource path rejected: traversal");
                return Err(HarnessError::InvalidResourcePath {
                    path: path.to_string(),
                    reason: "contains traversal sequences".to_string(),
                });
            }
            Component::Prefix(_) => {
                return Err(HarnessError::InvalidResourcePath {
                    path: path.to_string(),
                    reason: "must be relative".to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(())
}

/// Join a logical path onto a filesystem root, refusing to leave the root.
///
/// # Errors
///
/// Returns `InvalidResourcePath` if the logical path is not confined.
pub fn confined_join(root: &Path, logical: &str) -> Result<PathBuf> {
    let normalized = normalize_logical_path(logical);
    validate_logical_path(&normalized)?;
    Ok(normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment)))
}

/// Strip any directory prefix from a path, keeping the final segment.
#[must_use]
pub fn remove_file_prefix(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// Strip the last extension from a file name (`a.b.json` → `a.b`).
#[must_use]
pub fn remove_file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Human-legible name for an input file: base name, no extension,
/// separators turned into spaces.
#[must_use]
pub fn input_display_name(input_path: &str) -> String {
    remove_file_extension(remove_file_prefix(input_path)).replace(['-', '_'], " ")
}

/// Report location for a sample whose descriptor names none, next to its
/// input (`inputs/a.json` → `inputs/a.output.json`).
#[must_use]
pub fn derived_output_path(input_path: &str) -> String {
    let input_path = normalize_logical_path(input_path);
    let name = remove_file_prefix(&input_path);
    let dir = &input_path[..input_path.len() - name.len()];
    format!("{dir}{}.output.json", remove_file_extension(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_logical_path() {
        assert_eq!(normalize_logical_path("./a/b.json"), "a/b.json");
        assert_eq!(normalize_logical_path("/a/b.json"), "a/b.json");
        assert_eq!(normalize_logical_path("a\\b\\c.json"), "a/b/c.json");
        assert_eq!(normalize_logical_path("a/b.json"), "a/b.json");
    }

    #[test]
    fn test_validate_rejects_traversal() {
        assert!(validate_logical_path("inputs/../../etc/passwd").is_err());
        assert!(validate_logical_path("").is_err());
        assert!(validate_logical_path("inputs/a.json").is_ok());
    }

    #[test]
    fn test_confined_join() {
        let root = Path::new("/tmp/root");
        let joined = confined_join(root, "./packs/a.json").unwrap();
        assert_eq!(joined, PathBuf::from("/tmp/root/packs/a.json"));
        assert!(confined_join(root, "../outside.json").is_err());
    }

    #[test]
    fn test_remove_file_prefix_and_extension() {
        assert_eq!(remove_file_prefix("samples/fx/trade-1.json"), "trade-1.json");
        assert_eq!(remove_file_prefix("trade-1.json"), "trade-1.json");
        assert_eq!(remove_file_extension("trade-1.json"), "trade-1");
        assert_eq!(remove_file_extension("a.expected.json"), "a.expected");
        assert_eq!(remove_file_extension("README"), "README");
        assert_eq!(remove_file_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_input_display_name() {
        assert_eq!(
            input_display_name("cdm-samples/fx/fx-forward_usd-eur.json"),
            "fx forward usd eur"
        );
        assert_eq!(input_display_name("a.json"), "a");
    }

    #[test]
    fn test_derived_output_path() {
        assert_eq!(derived_output_path("inputs/a.json"), "inputs/a.output.json");
        assert_eq!(derived_output_path("./fx/trade-1.json"), "fx/trade-1.output.json");
        assert_eq!(derived_output_path("trade"), "trade.output.json");
    }
}

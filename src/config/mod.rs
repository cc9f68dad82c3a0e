//! Configuration management for `expectation_harness`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. Programmatic overrides
//! 2. Environment variables (`EXPECTATIONS_*`)
//! 3. Config file (`expectations.yaml`)
//! 4. Defaults

use crate::error::{HarnessError, Result};
use crate::resource::{DirectorySource, ResourceSpace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "expectations.yaml";
/// Prefix of environment variables read into configuration.
pub const ENV_PREFIX: &str = "EXPECTATIONS_";
/// Directory holding expectation packs when nothing else is configured.
const DEFAULT_RESOURCE_ROOT: &str = "tests/expectations";

const KEY_ROOT: &str = "root";
const KEY_DESCRIPTOR_PATTERN: &str = "descriptor-pattern";
const KEY_RESOURCE_ROOTS: &str = "resource-roots";
const KEY_WRITE_ROOT: &str = "write-root";
const KEY_REWRITE_BASELINES: &str = "rewrite-baselines";

/// One source of configuration values, keyed by normalized name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `EXPECTATIONS_*` pairs; other names are ignored.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Values set in code; each one beats every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<String>,
    pub descriptor_pattern: Option<String>,
    pub resource_roots: Option<Vec<PathBuf>>,
    pub write_root: Option<PathBuf>,
    pub rewrite_baselines: Option<bool>,
}

impl ConfigOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(root) = &self.root {
            layer.insert(KEY_ROOT, root.clone());
        }
        if let Some(pattern) = &self.descriptor_pattern {
            layer.insert(KEY_DESCRIPTOR_PATTERN, pattern.clone());
        }
        if let Some(roots) = &self.resource_roots {
            let joined = roots
                .iter()
                .map(|root| root.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(",");
            layer.insert(KEY_RESOURCE_ROOTS, joined);
        }
        if let Some(path) = &self.write_root {
            layer.insert(KEY_WRITE_ROOT, path.to_string_lossy().into_owned());
        }
        if let Some(rewrite) = self.rewrite_baselines {
            layer.insert(KEY_REWRITE_BASELINES, rewrite.to_string());
        }

        layer
    }
}

/// Resolved settings of one expectation suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    /// Logical prefix under which descriptors are discovered.
    pub root: String,
    /// File-name filter for descriptors; `None` uses the built-in pattern.
    pub descriptor_pattern: Option<String>,
    /// Directories stacked into the resource space, earliest first.
    pub resource_roots: Vec<PathBuf>,
    /// Directory that rewritten baselines land in.
    pub write_root: PathBuf,
    /// When false, teardown only reports what would change.
    pub rewrite_baselines: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            descriptor_pattern: None,
            resource_roots: vec![PathBuf::from(DEFAULT_RESOURCE_ROOT)],
            write_root: PathBuf::from(DEFAULT_RESOURCE_ROOT),
            rewrite_baselines: true,
        }
    }
}

impl HarnessConfig {
    /// Load from `expectations.yaml` in the working directory, the environment,
    /// and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or a value is invalid.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE_NAME), overrides)
    }

    /// Load with an explicit config file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or a value is invalid.
    pub fn load_from(config_path: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let layer = ConfigLayer::merge_layers(&[
            ConfigLayer::from_yaml(config_path)?,
            ConfigLayer::from_env(),
            overrides.as_layer(),
        ]);
        Self::from_layer(&layer)
    }

    /// Apply a merged layer on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unparseable flags or an empty resource root list.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let mut config = Self::default();
        let mut write_root_set = false;

        if let Some(root) = layer.get(KEY_ROOT) {
            config.root = root.trim().to_string();
        }
        if let Some(pattern) = layer.get(KEY_DESCRIPTOR_PATTERN) {
            let pattern = pattern.trim();
            config.descriptor_pattern = (!pattern.is_empty()).then(|| pattern.to_string());
        }
        if let Some(roots) = layer.get(KEY_RESOURCE_ROOTS) {
            config.resource_roots = roots
                .split(',')
                .map(str::trim)
                .filter(|root| !root.is_empty())
                .map(PathBuf::from)
                .collect();
            if config.resource_roots.is_empty() {
                return Err(HarnessError::config("resource-roots must name a directory"));
            }
        }
        if let Some(path) = layer.get(KEY_WRITE_ROOT) {
            config.write_root = PathBuf::from(path.trim());
            write_root_set = true;
        }
        if let Some(value) = layer.get(KEY_REWRITE_BASELINES) {
            config.rewrite_baselines = parse_bool(value).ok_or_else(|| {
                HarnessError::config(format!("rewrite-baselines: not a boolean: {value:?}"))
            })?;
        }

        if !write_root_set {
            if let Some(first) = config.resource_roots.first() {
                config.write_root.clone_from(first);
            }
        }

        Ok(config)
    }

    /// One directory container per resource root, in configured order.
    #[must_use]
    pub fn resource_space(&self) -> ResourceSpace {
        self.resource_roots
            .iter()
            .fold(ResourceSpace::new(), |space, root| {
                space.with_source(DirectorySource::new(root))
            })
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

//! Configuration for the view driver
//!
//! Options are kept as a loose name -> value mapping so hosts can pass
//! through keys the driver does not know about. Typed accessors apply the
//! defaults.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::naming::AutoRule;

/// Default view subdirectory name
pub const DEFAULT_VIEW_DIR_NAME: &str = "view";

/// Extensions recognized when `view_suffix` is unset or empty
pub const DEFAULT_VIEW_SUFFIX: &str = "hbs,html";

/// Subdirectory of the runtime path used when `cache_path` is unset
pub const DEFAULT_CACHE_DIR_NAME: &str = "view";

/// Option mapping for the view driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewConfig {
    options: Map<String, Value>,
}

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(options: Map<String, Value>) -> Self {
        Self { options }
    }

    /// Merge options in; later values replace earlier ones key by key
    pub fn merge(&mut self, options: Map<String, Value>) {
        debug!(keys = ?options.keys().collect::<Vec<_>>(), "ViewConfig::merge: called");
        self.options.extend(options);
    }

    /// Set a single option
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.options.insert(name.to_string(), value.into());
    }

    /// Raw option lookup; a stored `null` reads as absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name).filter(|value| !value.is_null())
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn auto_rule(&self) -> AutoRule {
        AutoRule::from_value(self.get("auto_rule"))
    }

    /// Configured cache directory, if any
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.get("cache_path")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// View directory name; an empty name searches the base directories themselves
    pub fn view_dir_name(&self) -> &str {
        self.get("view_dir_name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VIEW_DIR_NAME)
    }

    /// Recognized extensions in priority order, without leading dots
    pub fn view_suffixes(&self) -> Vec<String> {
        let configured = self
            .get("view_suffix")
            .and_then(Value::as_str)
            .map(parse_suffixes)
            .unwrap_or_default();

        if configured.is_empty() {
            parse_suffixes(DEFAULT_VIEW_SUFFIX)
        } else {
            configured
        }
    }

    /// Whether compiled templates are reused between renders
    pub fn tpl_cache(&self) -> bool {
        self.get("tpl_cache").and_then(Value::as_bool).unwrap_or(true)
    }

    /// Whether missing template variables are render errors
    pub fn strict_variables(&self) -> bool {
        self.get("strict_variables").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get("log_level").and_then(Value::as_str)
    }

    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_file(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("viewdriver").join("config.yml")),
            Some(PathBuf::from("viewdriver.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_file(path);
            }
        }

        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        debug!(?path, "ViewConfig::load_file: called");
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: Map<String, Value> =
            serde_yaml::from_str(&content).context(format!("Failed to parse config {}", path.display()))?;
        Ok(Self::from_map(options))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn parse_suffixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

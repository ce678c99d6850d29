use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use roster_store_sqlite::StoreSettings;
use serde::Deserialize;

use crate::auth::AuthSettings;

/// Top-level configuration. Every field has a default, so an empty or missing file
/// yields an unconfigured (demo mode) session with the default administrator pair.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RosterConfig {
    pub store: StoreSettings,
    pub auth: AuthSettings,
}

impl RosterConfig {
    /// Load YAML configuration from `path`; a missing file gives the defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// # Errors
    /// Returns an error when `raw` is not valid configuration YAML.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("invalid roster configuration")
    }
}

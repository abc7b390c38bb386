//! Configuration for role substitutions and plan storage.
//!
//! Load order: `.schemaswap/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level schemaswap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Role name → fully-qualified concrete-type identifier.
    ///
    /// A role absent from this table silently takes the library default.
    /// A role *present* here must resolve; a broken entry is an error,
    /// never a fallback.
    pub substitutions: BTreeMap<String, String>,
    pub storage: StorageConfig,
}

/// Plan storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Pretty-print the persisted plan JSON (diff-friendly, default on).
    pub pretty: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl SwapConfig {
    /// Load config from `.schemaswap/config.toml` in the project root, with
    /// env var overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".schemaswap").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("SCHEMASWAP_PLAN_PRETTY", &mut config.storage.pretty);

        Ok(config)
    }
}

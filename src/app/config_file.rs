//! Configuration file loading and parsing
//!
//! Loads configuration from `~/.config/catalog-preview/config.toml`

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::gate::SizeThresholds;
use crate::loaders::{BucketPolicy, Limits};
use crate::services::Endpoints;
use crate::session::SessionConfig;

/// Main configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Backend service base URLs
    pub endpoints: Endpoints,
    /// Size gate thresholds
    pub thresholds: SizeThresholds,
    /// Byte budgets of bounded fetches
    pub limits: Limits,
    /// Browsing session TTL and refresh schedule
    pub session: SessionConfig,
    /// HTML trust policy
    pub buckets: BucketPolicy,
}

impl ConfigFile {
    /// Get the config directory path (~/.config/catalog-preview)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("catalog-preview"))
    }

    /// Get the config file path (~/.config/catalog-preview/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_or_default(&path),
            _ => Self::default(),
        }
    }

    /// Load from `path`, logging and falling back to defaults on failure
    pub fn load_or_default(path: &PathBuf) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            Self::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }
}

//! TOML-based application configuration.
//!
//! Stores sync preferences: which calendar to mirror into, whether to
//! sync automatically, and fetch-window overrides.
//!
//! Configuration is stored at `~/.config/taskmirror/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, CoreError};

/// Sync-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Calendar the engine mirrors tasks into.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// Synchronize automatically after local edits.
    #[serde(default)]
    pub auto_sync: bool,
    /// Months of history fetched each pass.
    #[serde(default = "default_months_back")]
    pub window_months_back: u32,
    /// Months of future fetched each pass.
    #[serde(default = "default_months_ahead")]
    pub window_months_ahead: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            auto_sync: false,
            window_months_back: default_months_back(),
            window_months_ahead: default_months_ahead(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/taskmirror/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration, falling back to defaults if the file does not
    /// exist yet.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_months_back() -> u32 {
    3
}

fn default_months_ahead() -> u32 {
    12
}

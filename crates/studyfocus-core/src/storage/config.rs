//! TOML-based application configuration.
//!
//! Stores:
//! - Where the SQLite store lives and which keys hold each collection
//! - Trend chart length
//! - Export file naming
//!
//! Configuration is stored at `~/.config/studyfocus/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{data_dir, StorageKeys};
use crate::error::ConfigError;

/// Store location and key layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File name of the SQLite store inside the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default)]
    pub keys: StorageKeys,
}

/// Trend chart settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Days on the trend chart, ending today.
    #[serde(default = "default_trend_days")]
    pub days: usize,
}

/// Export artifact settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyfocus/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_database_file() -> String {
    "studyfocus.db".into()
}
fn default_trend_days() -> usize {
    crate::stats::DEFAULT_TREND_DAYS
}
fn default_filename_prefix() -> String {
    "studyfocus-export".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            keys: StorageKeys::default(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            days: default_trend_days(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Parse a TOML document. Missing sections take their defaults.
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML for this shape.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Render as pretty TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = self.to_toml_string()?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Absolute path of the SQLite store.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join(&self.storage.database_file))
    }

    /// Get a config value as string by dot-separated key (`storage.keys.sessions`).
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let json = serde_json::to_value(self).ok()?;
        let pointer = format!("/{}", key.replace('.', "/"));
        match json.pointer(&pointer)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a string config value by dot-separated key, without saving.
    ///
    /// # Errors
    /// Returns an error if the key does not name an existing string setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::ParseFailed(format!("unknown config key: {key}"));
        if key.is_empty() {
            return Err(unknown());
        }
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let pointer = format!("/{}", key.replace('.', "/"));
        match json.pointer_mut(&pointer) {
            Some(slot) if slot.is_string() => {
                *slot = serde_json::Value::String(value.to_string());
            }
            _ => return Err(unknown()),
        }
        *self =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(())
    }
}

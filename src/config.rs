//! Configuration management for kowctl.
//!
//! Configuration is loaded from `~/.config/kowctl/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend server location and transport options.
    #[serde(default)]
    pub server: ServerConfig,
    /// History persistence options.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Output preferences.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the kowalski backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend (default: http://localhost:8080).
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Request timeout in seconds. Unset leaves the transport default so
    /// slow commands (large anagram spaces) are not cut off.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: None,
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

/// History persistence options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Persist history across sessions (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Override the history file location.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Output preferences for the one-shot printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Use colours when stdout is a terminal (default: true).
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("kowctl"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the history slot, honouring the enabled flag and any override.
    pub fn history_path(&self) -> Result<Option<PathBuf>> {
        if !self.history.enabled {
            return Ok(None);
        }
        match &self.history.path {
            Some(path) => Ok(Some(path.clone())),
            None => crate::history::HistoryStore::default_path().map(Some),
        }
    }
}

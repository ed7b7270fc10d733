//! Configuration management
//!
//! This module handles loading, validation, and management of the Gavel configuration.
//! Configuration is stored in TOML format at ~/.gavel/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory (holds the score database)
//! - **server**: Listen address and per-connection outbound queue length
//! - **session**: Default presentation length and track filtering
//!
//! # Examples
//!
//! ```no_run
//! use gavel_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! println!("Slot length: {}ms", config.session.default_duration_ms);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP / WebSocket server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Judging session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Events queued per connection before further events to it are dropped
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Presentation length used when the director does not pass one
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,

    /// Scope presentations and reconciliation to the participant's track
    #[serde(default = "default_true")]
    pub filter_by_track: bool,
}

impl SessionConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.gavel")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_duration_ms() -> u64 {
    3 * 60 * 1000
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_duration_ms(),
            filter_by_track: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.gavel/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        // Serialize before path expansion so the file keeps the portable ~ form
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.gavel/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".gavel").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Path of the SQLite score database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("gavel.db")
    }

    /// Validate fields, expand ~ in the data directory and create it
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.server.port == 0 {
            return Err(EngineError::Config("server.port must be non-zero".to_string()));
        }

        if self.server.outbound_buffer == 0 {
            return Err(EngineError::Config(
                "server.outbound_buffer must be at least 1".to_string(),
            ));
        }

        if self.session.default_duration_ms == 0 {
            return Err(EngineError::Config(
                "session.default_duration_ms must be greater than zero".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.session.default_duration_ms, 180_000);
        assert!(config.session.filter_by_track);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_rejects_zero_duration() {
        let dir = tempfile::TempDir::new().unwrap();
        let toml = format!(
            "[core]\ndata_dir = \"{}\"\n\n[session]\ndefault_duration_ms = 0\n",
            dir.path().display()
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("default_duration_ms"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.server.host, deserialized.server.host);
        assert_eq!(
            config.session.default_duration_ms,
            deserialized.session.default_duration_ms
        );
    }
}

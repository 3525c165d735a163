//! Configuration management for filekit.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/filekit/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::path::has_protocol;
use crate::platform::StorageKind;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("attempts must be between 1 and 100, got {0}")]
    InvalidAttempts(u32),

    #[error("root_path must be a plain relative or absolute path, got {0:?}")]
    InvalidRootPath(String),

    #[error("user_agent must not be empty")]
    EmptyUserAgent,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Where files are stored.
    pub storage: StorageConfig,

    /// Download and upload settings.
    pub transfer: TransferConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Sandbox directory on disk. Each storage kind gets a subdirectory.
    pub root_dir: PathBuf,

    /// Root path inside the sandbox under which relative paths are stored.
    pub root_path: String,

    /// Storage kind used when none is requested explicitly.
    pub kind: StorageKind,
}

/// Transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Download retries after the first failed try.
    pub attempts: u32,

    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            root_path: "files".to_string(),
            kind: StorageKind::Persistent,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            attempts: crate::files::DEFAULT_DOWNLOAD_ATTEMPTS,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filekit")
        .join("config.toml")
}

/// Returns the default sandbox directory.
fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filekit")
}

/// User agent identifying this version of filekit.
pub fn default_user_agent() -> String {
    format!("filekit/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILEKIT_ROOT_DIR: Override the sandbox directory
    /// - FILEKIT_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("FILEKIT_ROOT_DIR") {
            if !dir.is_empty() {
                tracing::info!("Overriding root_dir from environment: {}", dir);
                self.storage.root_dir = PathBuf::from(dir);
            }
        }

        if let Ok(level) = std::env::var("FILEKIT_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transfer.attempts < 1 || self.transfer.attempts > 100 {
            return Err(ConfigError::InvalidAttempts(self.transfer.attempts));
        }

        let root_path = &self.storage.root_path;
        if has_protocol(root_path) || root_path.split('/').any(|s| s == "..") {
            return Err(ConfigError::InvalidRootPath(root_path.clone()));
        }

        if self.transfer.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.storage.root_path, "files");
        assert_eq!(config.storage.kind, StorageKind::Persistent);
        assert_eq!(config.transfer.attempts, 3);
        assert!(config.transfer.user_agent.starts_with("filekit/"));
        assert!(config.storage.root_dir.to_string_lossy().contains("filekit"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[transfer]
attempts = 5

[logging]
log_level = "debug"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.transfer.attempts, 5);
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.storage.root_path, "files");
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[storage]
root_dir = "/var/lib/filekit"
root_path = "appdata"
kind = "temporary"

[transfer]
attempts = 7
user_agent = "custom/1.0"

[logging]
log_level = "trace"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.storage.root_dir, PathBuf::from("/var/lib/filekit"));
        assert_eq!(config.storage.root_path, "appdata");
        assert_eq!(config.storage.kind, StorageKind::Temporary);
        assert_eq!(config.transfer.attempts, 7);
        assert_eq!(config.transfer.user_agent, "custom/1.0");
        assert_eq!(config.logging.log_level, "trace");
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[storage
root_path = "x"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_unknown_kind() {
        let toml = r#"
[storage]
kind = "cloud"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.storage.root_path = "media".to_string();
        original.storage.kind = StorageKind::Temporary;
        original.transfer.attempts = 9;

        let loaded = Config::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_validate_attempts() {
        let mut config = Config::default();
        config.transfer.attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAttempts(0)));

        config.transfer.attempts = 101;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAttempts(101)));
    }

    #[test]
    fn test_validate_root_path() {
        let mut config = Config::default();
        config.storage.root_path = "file:///sdcard".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRootPath(_))));

        config.storage.root_path = "files/../escape".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRootPath(_))));

        config.storage.root_path = "/absolute/ok".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level_and_user_agent() {
        let mut config = Config::default();
        config.logging.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.logging.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );

        let mut config = Config::default();
        config.transfer.user_agent = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyUserAgent));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.storage.root_path = "saved".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("FILEKIT_ROOT_DIR", "/tmp/filekit-env");
        std::env::set_var("FILEKIT_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();

        std::env::remove_var("FILEKIT_ROOT_DIR");
        std::env::remove_var("FILEKIT_LOG_LEVEL");

        assert_eq!(config.storage.root_dir, PathBuf::from("/tmp/filekit-env"));
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_ignore_empty() {
        std::env::set_var("FILEKIT_LOG_LEVEL", "");

        let mut config = Config::default();
        config.apply_env_overrides();

        std::env::remove_var("FILEKIT_LOG_LEVEL");

        assert_eq!(config.logging.log_level, "info");
    }
}

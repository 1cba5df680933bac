//! Configuration loading, validation, and management for groupwire.
//!
//! Loads configuration from `~/.groupwire/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use logging::LoggingConfig;

/// The root configuration structure.
///
/// Maps directly to `~/.groupwire/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Member command and messaging behaviour
    #[serde(default)]
    pub members: MemberSettings,

    /// Event bus configuration
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSettings {
    /// Seconds a special title stays; -1 keeps it permanently.
    #[serde(default = "default_title_duration")]
    pub special_title_duration: i64,

    /// Ask the transport to bypass its cache on member refresh.
    #[serde(default)]
    pub refresh_no_cache: bool,

    /// Send plain messages with CQ-code escaping enabled.
    #[serde(default)]
    pub auto_escape: bool,
}

fn default_title_duration() -> i64 {
    -1
}

impl Default for MemberSettings {
    fn default() -> Self {
        Self {
            special_title_duration: default_title_duration(),
            refresh_no_cache: false,
            auto_escape: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the async subscriber channel
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl AdapterConfig {
    /// Load configuration from the default path (~/.groupwire/config.toml).
    ///
    /// Environment overrides:
    /// - `GROUPWIRE_LOG`: log filter directive
    /// - `GROUPWIRE_EVENT_CAPACITY`: event channel capacity
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup("GROUPWIRE_LOG") {
            self.logging.filter = filter;
        }

        if let Some(raw) = lookup("GROUPWIRE_EVENT_CAPACITY") {
            self.events.capacity = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "GROUPWIRE_EVENT_CAPACITY must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".groupwire")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.events.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "events.capacity must be > 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.filter must not be empty".into(),
            ));
        }

        if self.members.special_title_duration < -1 {
            return Err(ConfigError::ValidationError(
                "members.special_title_duration must be -1 or a non-negative number of seconds"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

//! Configuration management for AudioTrigger
//!
//! This module provides:
//! - Configuration structs for the trigger logic, the cue sink and the sample listener
//! - TOML serialization with per-field defaults
//! - A manager resolving the per-user config file with corrupt-file fallback

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Presence detection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Suffix of the cue sent when a scene becomes active
    pub active_suffix: String,

    /// Suffix of the cue sent when a scene becomes inactive
    pub inactive_suffix: String,

    /// How long a scene must stay quiet before it is deactivated
    pub quiet_time_ms: u64,

    /// Evaluation period
    pub tick_period_ms: u64,

    /// Samples older than this read as quiet (0 = never stale)
    pub source_timeout_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            active_suffix: "active".to_string(),
            inactive_suffix: "inactive".to_string(),
            quiet_time_ms: 4000,
            tick_period_ms: 150,
            source_timeout_ms: 0,
        }
    }
}

impl TriggerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn source_timeout(&self) -> Option<Duration> {
        (self.source_timeout_ms > 0).then(|| Duration::from_millis(self.source_timeout_ms))
    }
}

/// Cue-automation service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,

    /// Wait between reconnection attempts
    pub reconnect_delay_ms: u64,

    /// Upper bound on a single connection attempt
    pub connect_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8081,
            reconnect_delay_ms: 1000,
            connect_timeout_ms: 1000,
        }
    }
}

impl SinkConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Inbound sample endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ListenerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete AudioTrigger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub trigger: TriggerConfig,
    pub sink: SinkConfig,
    pub listener: ListenerConfig,
}

impl RelayConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = self.to_toml()?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        let trigger = &self.trigger;
        if trigger.tick_period_ms == 0 {
            return Err(ConfigError::Invalid("tick_period_ms must be > 0".to_string()));
        }
        if trigger.quiet_time_ms == 0 {
            return Err(ConfigError::Invalid("quiet_time_ms must be > 0".to_string()));
        }
        if trigger.active_suffix.is_empty() || trigger.inactive_suffix.is_empty() {
            return Err(ConfigError::Invalid("cue suffixes cannot be empty".to_string()));
        }
        if trigger.active_suffix == trigger.inactive_suffix {
            return Err(ConfigError::Invalid(format!(
                "active and inactive suffixes are both '{}'",
                trigger.active_suffix
            )));
        }
        if self.sink.host.is_empty() || self.listener.host.is_empty() {
            return Err(ConfigError::Invalid("hosts cannot be empty".to_string()));
        }
        if self.sink.port == 0 {
            return Err(ConfigError::Invalid("sink port must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Resolves and loads the per-user configuration file
///
/// Manages the configuration file at `~/.config/audiotrigger/config.toml`.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for `<config_dir>/config.toml`
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_dir.join("config.toml"),
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/audiotrigger` on Linux
    /// Returns `%APPDATA%\audiotrigger` on Windows
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("audiotrigger"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, returns defaults.
    /// If the config file is corrupt, logs an error, keeps a backup and returns defaults.
    #[instrument(skip(self))]
    pub async fn load(&self) -> RelayConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, using defaults"
            );
            return RelayConfig::default();
        }

        match RelayConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );

                // Backup the corrupt config
                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                RelayConfig::default()
            }
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config: &RelayConfig) -> Result<()> {
        config.save_to_file(&self.config_path).await
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

//! Configuration loading and typed config structures for the Starhold engine.
//!
//! The canonical configuration lives in `starhold-config.yaml` at the
//! working directory. This module defines strongly-typed structs that
//! mirror the YAML structure, and provides a loader that reads and
//! validates the file. Every field has a default, so an empty file (or no
//! file at all) yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its permitted range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `starhold-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StarholdConfig {
    /// Tick cadence, persistence cadence, and monitoring.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Infrastructure connection settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StarholdConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure:
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `STARHOLD_GATEWAY_PORT` overrides `infrastructure.gateway_port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the scheduler section fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the scheduler section fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        config.scheduler.validate()?;
        Ok(config)
    }
}

/// Tick scheduler configuration. Immutable once the scheduler is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Real-time milliseconds between tick fires.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks between periodic full saves.
    #[serde(default = "default_save_interval_ticks")]
    pub save_interval_ticks: u64,

    /// Ticks between differential broadcasts.
    #[serde(default = "default_broadcast_interval_ticks")]
    pub broadcast_interval_ticks: u64,

    /// Whether per-tick statistics are sampled.
    #[serde(default = "default_true")]
    pub performance_monitoring: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            save_interval_ticks: default_save_interval_ticks(),
            broadcast_interval_ticks: default_broadcast_interval_ticks(),
            performance_monitoring: true,
        }
    }
}

impl SchedulerConfig {
    /// Reject intervals that would make the scheduler spin or divide by zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("save_interval_ticks", self.save_interval_ticks),
            ("broadcast_interval_ticks", self.broadcast_interval_ticks),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{field} must be at least 1"),
                });
            }
        }
        Ok(())
    }

    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Infrastructure connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `Dragonfly` URL for durable saves. When absent the engine keeps
    /// saves in memory.
    #[serde(default)]
    pub dragonfly_url: Option<String>,

    /// TCP port of the session gateway.
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: None,
            gateway_port: default_gateway_port(),
        }
    }
}

impl InfrastructureConfig {
    /// Override connection settings from environment variables, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DRAGONFLY_URL") {
            if !url.is_empty() {
                self.dragonfly_url = Some(url);
            }
        }
        if let Ok(port) = std::env::var("STARHOLD_GATEWAY_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.gateway_port = p,
                Err(e) => tracing::warn!(
                    value = port.as_str(),
                    error = %e,
                    "ignoring invalid STARHOLD_GATEWAY_PORT"
                ),
            }
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_save_interval_ticks() -> u64 {
    60
}

const fn default_broadcast_interval_ticks() -> u64 {
    1
}

const fn default_true() -> bool {
    true
}

const fn default_gateway_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

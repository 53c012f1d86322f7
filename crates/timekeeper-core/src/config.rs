//! Configuration loading and typed config structures for Timekeeper.
//!
//! The canonical configuration lives in `clock-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure and provides a loader that reads the file. Infrastructure
//! URLs can be overridden with environment variables for containerized
//! deployments.

use std::path::Path;

use serde::Deserialize;
use timekeeper_types::defaults;

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
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Timekeeper configuration.
///
/// Mirrors the structure of `clock-config.yaml`. All fields have defaults
/// matching the original deployment values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimekeeperConfig {
    /// Clock seeding and day/night settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observer-side behavior.
    #[serde(default)]
    pub observer: ObserverConfig,
}

impl TimekeeperConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure URLs:
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `NATS_URL` overrides `infrastructure.nats_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Clock seeding and day/night configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Hour at which the day regime begins (0-23).
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u8,

    /// Hour at which the night regime begins (0-23).
    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u8,

    /// Real milliseconds per game minute during the day.
    #[serde(default = "default_ms_per_minute")]
    pub day_ms_per_minute: u32,

    /// Real milliseconds per game minute during the night.
    #[serde(default = "default_ms_per_minute")]
    pub night_ms_per_minute: u32,

    /// Whether the clock starts paused.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            day_start_hour: default_day_start_hour(),
            night_start_hour: default_night_start_hour(),
            day_ms_per_minute: default_ms_per_minute(),
            night_ms_per_minute: default_ms_per_minute(),
            start_paused: false,
        }
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs with environment variables when set.
    ///
    /// This allows Docker Compose (or any deployment) to set connection
    /// strings via env vars without modifying the YAML config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            nats_url: default_nats_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Observer-side behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether an observer requests a snapshot and synchronizes its visual
    /// clock as soon as it connects.
    #[serde(default = "default_true")]
    pub sync_on_connect: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            sync_on_connect: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_day_start_hour() -> u8 {
    defaults::DAY_START_HOUR
}

const fn default_night_start_hour() -> u8 {
    defaults::NIGHT_START_HOUR
}

const fn default_ms_per_minute() -> u32 {
    defaults::MS_PER_GAME_MINUTE
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TimekeeperConfig::default();
        assert_eq!(config.clock.day_start_hour, 6);
        assert_eq!(config.clock.night_start_hour, 21);
        assert_eq!(config.clock.day_ms_per_minute, 2000);
        assert!(!config.clock.start_paused);
        assert!(config.observer.sync_on_connect);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
clock:
  day_start_hour: 7
  night_start_hour: 19
  day_ms_per_minute: 1500
  night_ms_per_minute: 6000
  start_paused: true

infrastructure:
  dragonfly_url: redis://testhost:6379
  nats_url: nats://testhost:4222

logging:
  level: debug

observer:
  sync_on_connect: false
";
        let config = TimekeeperConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.clock.day_start_hour, 7);
        assert_eq!(config.clock.night_start_hour, 19);
        assert_eq!(config.clock.day_ms_per_minute, 1500);
        assert_eq!(config.clock.night_ms_per_minute, 6000);
        assert!(config.clock.start_paused);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.observer.sync_on_connect);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "clock:\n  day_start_hour: 8\n";
        let config = TimekeeperConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // The one override lands; everything else uses defaults.
        assert_eq!(config.clock.day_start_hour, 8);
        assert_eq!(config.clock.night_start_hour, 21);
        assert_eq!(config.clock.night_ms_per_minute, 2000);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = TimekeeperConfig::parse("");
        assert!(config.is_ok());
    }
}

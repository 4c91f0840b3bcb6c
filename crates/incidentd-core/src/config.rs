//! Retention configuration.
//!
//! The retention window and cycle cadence are configuration, not runtime
//! state: the engine receives the window per cycle and the scheduler owns
//! the cadence. Defaults follow the deployed values (5 hour window, 5
//! minute cadence).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default retention window: 5 hours.
pub const DEFAULT_WINDOW_SECS: u64 = 5 * 60 * 60;

/// Default scheduler cadence: 5 minutes.
pub const DEFAULT_INTERVAL_SECS: u64 = 5 * 60;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Retention window in seconds; active tickets strictly older than
    /// this are archived by the next cycle.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Seconds between scheduled cycles when running as a daemon.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Synthetic tickets to create per cycle. Zero disables seeding; the
    /// generator only exists for demos and tests.
    #[serde(default)]
    pub seed_per_cycle: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("incidentd.db")
}

const fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

const fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            window_secs: DEFAULT_WINDOW_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
            seed_per_cycle: 0,
        }
    }
}

impl RetentionConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Rejects configurations that would misbehave at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a zero retention window or
    /// a zero scheduler interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_secs == 0 {
            return Err(ConfigError::Validation(
                "window_secs must be greater than zero; a zero window would \
                 archive every ticket on the next cycle"
                    .to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Retention window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Scheduler cadence as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_values() {
        let config = RetentionConfig::default();
        assert_eq!(config.window_secs, 18_000);
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.seed_per_cycle, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = RetentionConfig::from_toml(
            r#"
            db_path = "/var/lib/incidentd/tickets.db"
            window_secs = 7200
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.db_path, PathBuf::from("/var/lib/incidentd/tickets.db"));
        assert_eq!(config.window_secs, 7200);
        assert_eq!(config.interval_secs, DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn rejects_zero_window() {
        let config = RetentionConfig {
            window_secs: 0,
            ..RetentionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_invalid_toml() {
        assert!(matches!(
            RetentionConfig::from_toml("window_secs = \"five hours\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("incidentd.toml");
        std::fs::write(&path, "interval_secs = 60\n").expect("write config");

        let config = RetentionConfig::from_file(&path).expect("load config");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.window_secs, DEFAULT_WINDOW_SECS);
    }
}

//! Facade configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::level::Level;

/// Configuration for the logging facade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Human-readable console output with colors instead of JSON lines.
    pub is_dev: bool,
    /// Console severity floor. Empty means `info`.
    pub level: String,
    /// One DSN per sink, e.g. `file:///var/log/app.log?max-size=100m` or
    /// `http://localhost:3000/logs?batch-size=50`.
    pub adaptors: Vec<String>,
}

impl Config {
    /// Builds configuration from `LOGTEE_DEV`, `LOGTEE_LEVEL`, and
    /// `LOGTEE_ADAPTORS` (a comma-separated DSN list).
    pub fn from_env() -> Result<Config, Error> {
        let is_dev = env::var("LOGTEE_DEV")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let level = env::var("LOGTEE_LEVEL")
            .map(|v| v.to_lowercase())
            .unwrap_or_default();
        let adaptors = env::var("LOGTEE_ADAPTORS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|dsn| !dsn.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Config {
            is_dev,
            level,
            adaptors,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates everything that must be right before sinks are built.
    pub fn validate(&self) -> Result<(), Error> {
        self.resolved_level().map(|_| ())
    }

    /// The console severity floor, with the empty string meaning `info`.
    pub fn resolved_level(&self) -> Result<Level, Error> {
        if self.level.is_empty() {
            return Ok(Level::Info);
        }
        self.level.parse().map_err(|source| Error::InvalidLevel {
            level: self.level.clone(),
            source,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolved_level().unwrap(), Level::Info);
    }

    #[test]
    fn test_explicit_levels_resolve() {
        for (name, level) in [
            ("trace", Level::Trace),
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("warn", Level::Warn),
            ("error", Level::Error),
        ] {
            let config = Config {
                level: name.to_string(),
                ..Default::default()
            };
            assert_eq!(config.resolved_level().unwrap(), level);
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = Config {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidLevel { level, .. }) if level == "loud"
        ));
    }

    #[test]
    fn test_deserializes_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"is_dev":true,"level":"debug","adaptors":["file:///tmp/app.log"]}"#,
        )
        .unwrap();
        assert!(config.is_dev);
        assert_eq!(config.level, "debug");
        assert_eq!(config.adaptors, vec!["file:///tmp/app.log".to_string()]);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(!config.is_dev);
        assert!(config.level.is_empty());
        assert!(config.adaptors.is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_all_fields() {
        env::set_var("LOGTEE_DEV", "true");
        env::set_var("LOGTEE_LEVEL", "DEBUG");
        env::set_var(
            "LOGTEE_ADAPTORS",
            "file:///tmp/app.log, http://localhost:3000/logs",
        );

        let config = Config::from_env();

        env::remove_var("LOGTEE_DEV");
        env::remove_var("LOGTEE_LEVEL");
        env::remove_var("LOGTEE_ADAPTORS");

        let config = config.unwrap();
        assert!(config.is_dev);
        assert_eq!(config.level, "debug");
        assert_eq!(
            config.adaptors,
            vec![
                "file:///tmp/app.log".to_string(),
                "http://localhost:3000/logs".to_string(),
            ]
        );
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_when_unset() {
        env::remove_var("LOGTEE_DEV");
        env::remove_var("LOGTEE_LEVEL");
        env::remove_var("LOGTEE_ADAPTORS");

        let config = Config::from_env().unwrap();
        assert!(!config.is_dev);
        assert!(config.level.is_empty());
        assert!(config.adaptors.is_empty());
        assert_eq!(config.resolved_level().unwrap(), Level::Info);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_level() {
        env::set_var("LOGTEE_LEVEL", "shout");

        let result = Config::from_env();

        env::remove_var("LOGTEE_LEVEL");
        assert!(matches!(result, Err(Error::InvalidLevel { .. })));
    }
}

//! Sink severity levels.
//!
//! Five levels ordered from most to least verbose; a sink admits a record
//! when the record's severity is at or above the sink's minimum. Levels are
//! parsed case-insensitively from DSN `level` keys and from the facade
//! configuration, and parsing is strict: an unknown name is a configuration
//! error, never a silent default.

use std::fmt;
use std::str::FromStr;

use crate::error::DsnError;

/// Minimum severity a sink will accept.
///
/// Ordered `Trace < Debug < Info < Warn < Error`; the default is `Info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = DsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(DsnError::InvalidLevel(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(Level::from_str("debug").unwrap(), Level::Debug);
        assert_eq!(Level::from_str("DEBUG").unwrap(), Level::Debug);
        assert_eq!(Level::from_str("WaRn").unwrap(), Level::Warn);
        assert_eq!(Level::from_str("error").unwrap(), Level::Error);
        assert_eq!(Level::from_str("trace").unwrap(), Level::Trace);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!(Level::from_str("invalid").is_err());
        assert!(Level::from_str("").is_err());
        assert!(Level::from_str("fatal").is_err());
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(Level::default(), Level::Info);
    }

    #[test]
    fn test_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_display_round_trips() {
        for level in [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
        ] {
            assert_eq!(Level::from_str(&level.to_string()).unwrap(), level);
        }
    }
}

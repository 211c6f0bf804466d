//! Error types for DSN parsing, sink construction, and runtime writes.

use std::io;
use std::path::PathBuf;

/// Failures while parsing a DSN into typed sink options.
///
/// All of these surface synchronously at configuration time; nothing in this
/// enum is ever silently defaulted away.
#[derive(Debug, thiserror::Error)]
pub enum DsnError {
    #[error("invalid DSN {dsn:?}: {source}")]
    InvalidDsn {
        dsn: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid size format: {0:?} (expected: 10m, 100mb, 1g, etc.)")]
    InvalidSize(String),

    #[error("invalid day format: {0:?} (expected: 1d, 7days, 30d, etc.)")]
    InvalidDays(String),

    #[error("invalid {key}: {value:?}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("invalid timeout {value:?}: {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid compress format: {0:?} (supported: gzip, none)")]
    InvalidCompress(String),

    #[error("invalid level: {0:?} (valid levels: trace, debug, info, warn, error)")]
    InvalidLevel(String),

    #[error("invalid {key}: {value:?} (expected: true, false)")]
    InvalidBool { key: &'static str, value: String },
}

/// Failures while constructing a sink from parsed options.
#[derive(Debug, thiserror::Error)]
pub enum AdaptorError {
    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error("file path is empty")]
    EmptyPath,

    #[error("HTTP URL is empty")]
    EmptyUrl,

    #[error("failed to create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Per-write failures on a sink. Non-fatal: the sink keeps running and the
/// caller is never blocked.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The bounded queue was full; the record was dropped.
    #[error("log buffer full, dropping record")]
    BufferFull,

    /// Shutdown has begun; nothing was enqueued or written.
    #[error("sink is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<WriteError> for io::Error {
    fn from(err: WriteError) -> io::Error {
        match err {
            WriteError::Io(e) => e,
            WriteError::BufferFull => {
                io::Error::new(io::ErrorKind::WouldBlock, WriteError::BufferFull)
            }
            WriteError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, WriteError::Closed),
        }
    }
}

/// Facade-level construction and lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid log level {level:?}: {source}")]
    InvalidLevel {
        level: String,
        #[source]
        source: DsnError,
    },

    /// A non-empty adaptor list produced zero working sinks.
    #[error("no adaptors created")]
    NoAdaptorsConstructed,

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dsn_error_display() {
        let err = DsnError::InvalidSize("100k".to_string());
        assert_eq!(
            err.to_string(),
            "invalid size format: \"100k\" (expected: 10m, 100mb, 1g, etc.)"
        );

        let err = DsnError::UnsupportedScheme("ftp".to_string());
        assert_eq!(err.to_string(), "unsupported scheme: ftp");

        let err = DsnError::InvalidInteger {
            key: "max-backups",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid max-backups: \"abc\"");
    }

    #[test]
    fn test_write_error_to_io_error() {
        let err: io::Error = WriteError::BufferFull.into();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let err: io::Error = WriteError::Closed.into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: io::Error = WriteError::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_facade_error_display() {
        assert_eq!(
            Error::NoAdaptorsConstructed.to_string(),
            "no adaptors created"
        );
    }
}

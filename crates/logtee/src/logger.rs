//! The logging facade.
//!
//! [`Logger`] assembles one console layer plus one JSON layer per configured
//! sink into an owned `tracing` [`Dispatch`]. Nothing global happens at
//! construction: callers either install the dispatcher process-wide with
//! [`Logger::init`] or scope it with `tracing::dispatcher::with_default`.
//!
//! Each sink layer filters by its own DSN level and additionally mutes this
//! crate's targets, so the HTTP worker's own diagnostics reach the console
//! but can never feed back into the sinks they describe.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{dispatcher, error, Dispatch};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::adaptor::{Adaptor, AdaptorWriter};
use crate::config::Config;
use crate::error::{Error, WriteError};

/// Facade over a console layer and the configured sinks.
pub struct Logger {
    dispatch: Dispatch,
    adaptors: Vec<Arc<Adaptor>>,
    closed: AtomicBool,
}

impl Logger {
    /// Builds the facade from a [`Config`].
    ///
    /// A DSN that fails to parse or construct is skipped without affecting
    /// the others; a non-empty DSN list that produces zero sinks is an
    /// error. HTTP sinks spawn their worker on the ambient Tokio runtime.
    pub fn new(config: &Config) -> Result<Logger, Error> {
        let console_level = config.resolved_level()?;

        let mut adaptors = Vec::new();
        for dsn in &config.adaptors {
            match Adaptor::from_dsn(dsn) {
                Ok(adaptor) => adaptors.push(Arc::new(adaptor)),
                Err(e) => error!("skipping adaptor {dsn:?}: {e}"),
            }
        }
        if !config.adaptors.is_empty() && adaptors.is_empty() {
            return Err(Error::NoAdaptorsConstructed);
        }

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        let console_filter =
            EnvFilter::try_new(format!("h2=off,hyper=off,rustls=off,{console_level}"))
                .expect("could not parse console log filter");
        if config.is_dev {
            layers.push(
                fmt::layer()
                    .with_writer(io::stdout)
                    .with_ansi(true)
                    .with_filter(console_filter)
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(io::stdout)
                    .with_ansi(false)
                    .with_filter(console_filter)
                    .boxed(),
            );
        }

        for adaptor in &adaptors {
            let filter = EnvFilter::try_new(format!(
                "{},logtee=off,h2=off,hyper=off,rustls=off,reqwest=off",
                adaptor.level()
            ))
            .expect("could not parse adaptor log filter");
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(AdaptorWriter::new(Arc::clone(adaptor)))
                    .with_ansi(false)
                    .with_filter(filter)
                    .boxed(),
            );
        }

        let dispatch = Dispatch::new(tracing_subscriber::registry().with(layers));

        Ok(Logger {
            dispatch,
            adaptors,
            closed: AtomicBool::new(false),
        })
    }

    /// Handle to this facade's subscriber, for scoped use via
    /// `tracing::dispatcher::with_default`.
    #[must_use]
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Installs this facade as the process-global `tracing` subscriber.
    pub fn init(&self) -> Result<(), Error> {
        dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| Error::AlreadyInitialized)
    }

    /// Synchronizes every sink: file sinks sync to disk, HTTP sinks are
    /// untouched (their delivery is asynchronous by design). Returns the
    /// first error but still flushes the rest.
    pub fn flush(&self) -> Result<(), WriteError> {
        let mut result = Ok(());
        for adaptor in &self.adaptors {
            if let Err(e) = adaptor.flush() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Closes every sink exactly once, waiting for HTTP workers to flush
    /// their pending batches. Returns the first error but still closes the
    /// rest; repeat calls are no-ops.
    pub async fn close(&self) -> Result<(), WriteError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut result = Ok(());
        for adaptor in &self.adaptors {
            if let Err(e) = adaptor.close().await {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn file_dsn(dir: &TempDir, query: &str) -> String {
        format!("file://{}/app.log{query}", dir.path().display())
    }

    #[test]
    fn test_console_only_facade_constructs() {
        let logger = Logger::new(&Config::default()).unwrap();
        assert!(logger.adaptors.is_empty());
    }

    #[test]
    fn test_invalid_level_fails_construction() {
        let config = Config {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Logger::new(&config),
            Err(Error::InvalidLevel { .. })
        ));
    }

    #[test]
    fn test_all_bad_dsns_fail_construction() {
        let config = Config {
            adaptors: vec![
                "redis://localhost:6379".to_string(),
                "not a dsn".to_string(),
            ],
            ..Default::default()
        };
        assert!(matches!(
            Logger::new(&config),
            Err(Error::NoAdaptorsConstructed)
        ));
    }

    #[test]
    fn test_bad_dsn_skipped_good_one_kept() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            adaptors: vec!["redis://localhost:6379".to_string(), file_dsn(&dir, "")],
            ..Default::default()
        };
        let logger = Logger::new(&config).unwrap();
        assert_eq!(logger.adaptors.len(), 1);
    }

    #[test]
    fn test_scoped_dispatch_writes_json_to_file() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            adaptors: vec![file_dsn(&dir, "")],
            ..Default::default()
        };
        let logger = Logger::new(&config).unwrap();

        dispatcher::with_default(&logger.dispatch(), || {
            tracing::info!(target: "app", user = "ada", "file sink smoke test");
        });
        logger.flush().unwrap();

        let contents = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(contents.contains("file sink smoke test"), "{contents}");
        assert!(contents.contains("\"user\":\"ada\""), "{contents}");
    }

    #[test]
    fn test_adaptor_level_filters_below_threshold() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            adaptors: vec![file_dsn(&dir, "?level=error")],
            ..Default::default()
        };
        let logger = Logger::new(&config).unwrap();

        dispatcher::with_default(&logger.dispatch(), || {
            tracing::info!(target: "app", "kept out");
            tracing::error!(target: "app", "let through");
        });
        logger.flush().unwrap();

        let contents = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(!contents.contains("kept out"), "{contents}");
        assert!(contents.contains("let through"), "{contents}");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            adaptors: vec![file_dsn(&dir, "")],
            ..Default::default()
        };
        let logger = Logger::new(&config).unwrap();
        logger.close().await.unwrap();
        logger.close().await.unwrap();
    }

    #[test]
    #[serial]
    fn test_init_installs_global_once() {
        let logger = Logger::new(&Config::default()).unwrap();
        logger.init().unwrap();

        let second = Logger::new(&Config::default()).unwrap();
        assert!(matches!(second.init(), Err(Error::AlreadyInitialized)));
    }
}

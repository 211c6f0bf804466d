//! # Logtee
//!
//! Tees structured log events to the console and to any number of
//! DSN-configured sinks, each with its own severity threshold, on top of
//! [`tracing`].
//!
//! ## Overview
//!
//! A [`Logger`] owns a `tracing` dispatcher wired as one console layer plus
//! one JSON layer per sink:
//!
//! - **Console**: human-readable with ANSI colors in dev mode, JSON lines in
//!   production.
//! - **File**: JSON lines with size-based rotation, backup pruning by count
//!   and age, and optional gzip compression of rotated files.
//! - **HTTP**: JSON arrays POSTed in batches by a background worker with a
//!   bounded queue; a full queue drops the record rather than block the
//!   caller.
//!
//! Sinks are configured by DSN:
//!
//! ```text
//! file:///var/log/app.log?max-size=100m&max-backups=10&max-age=30d&compress=gzip&level=info
//! http://localhost:3000/logs?timeout=10s&buffer-size=1024&batch-size=100&max-retries=3&level=warn
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use logtee::{Config, Logger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         adaptors: vec![
//!             "file:///var/log/app.log?max-size=100m&compress=gzip".to_string(),
//!             "http://localhost:3000/logs?batch-size=100&level=warn".to_string(),
//!         ],
//!         ..Default::default()
//!     };
//!
//!     let logger = Logger::new(&config)?;
//!     logger.init()?;
//!
//!     tracing::info!(user = "ada", "signed in");
//!
//!     logger.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_copy_implementations)]

/// Sink construction, scheme dispatch, and the `tracing` writer bridge
pub mod adaptor;

/// Configuration from environment variables or deserialized structures
pub mod config;

/// DSN parsing into typed sink options
pub mod dsn;

/// Error types for parsing, construction, and runtime writes
pub mod error;

/// Batching HTTP sink with a background delivery worker
pub mod http;

/// Severity levels shared by the facade and the sinks
pub mod level;

/// The facade: layer assembly, dispatch, init, flush, and close
pub mod logger;

/// Size-based file rotation with pruning and compression
pub mod rotate;

pub use config::Config;
pub use error::{AdaptorError, DsnError, Error, WriteError};
pub use level::Level;
pub use logger::Logger;

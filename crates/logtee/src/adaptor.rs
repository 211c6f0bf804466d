//! Sink construction and dispatch.
//!
//! A DSN's scheme picks the sink kind exactly once, here, producing a tagged
//! [`Adaptor`]; everything downstream dispatches on the variant. The module
//! also bridges adaptors into `tracing_subscriber`'s writer model so fmt
//! layers can write through them.

use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use crate::dsn::{self, FileOptions};
use crate::error::{AdaptorError, DsnError, WriteError};
use crate::http::HttpSink;
use crate::level::Level;
use crate::rotate::RotatingWriter;

/// Rotating file target for one `file://` DSN.
#[derive(Debug)]
pub struct FileSink {
    writer: RotatingWriter,
}

impl FileSink {
    pub fn new(options: &FileOptions) -> Result<FileSink, AdaptorError> {
        Ok(FileSink {
            writer: RotatingWriter::new(options)?,
        })
    }

    pub fn write_record(&self, record: &[u8]) -> Result<(), WriteError> {
        self.writer.write_record(record).map_err(WriteError::Io)
    }

    pub fn flush(&self) -> Result<(), WriteError> {
        self.writer.flush().map_err(WriteError::Io)
    }

    pub fn close(&self) -> Result<(), WriteError> {
        self.writer.close().map_err(WriteError::Io)
    }
}

/// A constructed sink plus the severity floor its DSN requested.
#[derive(Debug)]
pub enum Adaptor {
    File { sink: FileSink, level: Level },
    Http { sink: HttpSink, level: Level },
}

impl Adaptor {
    /// Builds the sink a DSN describes. The scheme is read off the raw
    /// string; matching is case-insensitive.
    pub fn from_dsn(dsn: &str) -> Result<Adaptor, AdaptorError> {
        let scheme = dsn
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        match scheme.as_deref() {
            Some("file") => {
                let options = dsn::parse_file_options(dsn)?;
                Ok(Adaptor::File {
                    level: options.level,
                    sink: FileSink::new(&options)?,
                })
            }
            Some("http" | "https") => {
                let options = dsn::parse_http_options(dsn)?;
                Ok(Adaptor::Http {
                    level: options.level,
                    sink: HttpSink::new(&options)?,
                })
            }
            Some(other) => Err(DsnError::UnsupportedScheme(other.to_string()).into()),
            None => match Url::parse(dsn) {
                Err(source) => Err(DsnError::InvalidDsn {
                    dsn: dsn.to_string(),
                    source,
                }
                .into()),
                Ok(url) => Err(DsnError::UnsupportedScheme(url.scheme().to_string()).into()),
            },
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Adaptor::File { level, .. } | Adaptor::Http { level, .. } => *level,
        }
    }

    pub fn write_record(&self, record: &[u8]) -> Result<(), WriteError> {
        match self {
            Adaptor::File { sink, .. } => sink.write_record(record),
            Adaptor::Http { sink, .. } => sink.write_record(record),
        }
    }

    /// Syncs file sinks to disk. HTTP delivery stays asynchronous, so the
    /// HTTP arm has nothing to do.
    pub fn flush(&self) -> Result<(), WriteError> {
        match self {
            Adaptor::File { sink, .. } => sink.flush(),
            Adaptor::Http { .. } => Ok(()),
        }
    }

    pub async fn close(&self) -> Result<(), WriteError> {
        match self {
            Adaptor::File { sink, .. } => sink.close(),
            Adaptor::Http { sink, .. } => sink.close().await,
        }
    }
}

/// Writer handle a fmt layer writes formatted records through.
///
/// Failures surface as `io::Error` (a full HTTP queue becomes
/// `ErrorKind::WouldBlock`) and the fmt layer discards the record; the
/// emitting caller is never blocked or panicked.
pub struct AdaptorWriter(Arc<Adaptor>);

impl AdaptorWriter {
    #[must_use]
    pub fn new(adaptor: Arc<Adaptor>) -> AdaptorWriter {
        AdaptorWriter(adaptor)
    }
}

impl io::Write for &AdaptorWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for AdaptorWriter {
    type Writer = &'a AdaptorWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

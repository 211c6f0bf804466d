//! Size-based file rotation with backup retention.
//!
//! [`RotatingWriter`] appends records to a single target file and rotates it
//! aside once the next record would push it past the configured size cap.
//! Rotated files are renamed next to the target, optionally gzip-compressed,
//! and pruned by count and by age. Writers are safe to share across threads.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime};
use flate2::write::GzEncoder;

use crate::dsn::{Compression, FileOptions};
use crate::error::AdaptorError;

const DEFAULT_MAX_SIZE_MB: i64 = 100;

/// Timestamp embedded in backup file names. Colons are not filename-safe, so
/// the time-of-day separator is a dash. Sorts lexicographically.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

#[derive(Debug)]
struct Inner {
    file: Option<File>,
    size: u64,
}

/// Appending file writer that rotates at a size cap.
///
/// The parent directory is created at construction; the file itself is only
/// opened on the first write. Rotation renames the current file to
/// `<stem>-<local timestamp><ext>`, then applies compression and retention
/// policy to the accumulated backups.
#[derive(Debug)]
pub struct RotatingWriter {
    path: PathBuf,
    backup_prefix: String,
    backup_suffix: String,
    max_bytes: u64,
    max_backups: i64,
    max_age_days: i64,
    compress: Compression,
    inner: Mutex<Inner>,
}

impl RotatingWriter {
    pub fn new(options: &FileOptions) -> Result<RotatingWriter, AdaptorError> {
        if options.path.is_empty() {
            return Err(AdaptorError::EmptyPath);
        }
        let path = PathBuf::from(&options.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| AdaptorError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup_suffix = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let cap_mb = if options.max_size_mb > 0 {
            options.max_size_mb
        } else {
            DEFAULT_MAX_SIZE_MB
        };

        Ok(RotatingWriter {
            path,
            backup_prefix: format!("{stem}-"),
            backup_suffix,
            max_bytes: u64::try_from(cap_mb.saturating_mul(1024 * 1024)).unwrap_or(u64::MAX),
            max_backups: options.max_backups,
            max_age_days: options.max_age_days,
            compress: options.compress,
            inner: Mutex::new(Inner {
                file: None,
                size: 0,
            }),
        })
    }

    /// Appends one record, rotating first if the record would push the
    /// current file past the size cap. A record larger than the cap itself
    /// is rejected outright.
    pub fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let incoming = record.len() as u64;
        if incoming > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {incoming} exceeds maximum file size {}",
                    self.max_bytes
                ),
            ));
        }

        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.file.is_none() {
            let (file, size) = self.open_append()?;
            inner.file = Some(file);
            inner.size = size;
        }
        let rotated = if inner.size.saturating_add(incoming) > self.max_bytes {
            self.rotate_locked(&mut inner)?
        } else {
            None
        };
        if let Some(file) = inner.file.as_mut() {
            file.write_all(record)?;
            inner.size = inner.size.saturating_add(incoming);
        }
        drop(inner);

        if let Some(backup) = rotated {
            self.finish_rotation(&backup);
        }
        Ok(())
    }

    /// Syncs buffered state to disk.
    pub fn flush(&self) -> io::Result<()> {
        let inner = self.inner.lock().expect("lock poisoned");
        if let Some(file) = inner.file.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Syncs and releases the current file handle. A later write reopens the
    /// target in append mode.
    pub fn close(&self) -> io::Result<()> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.size = 0;
        if let Some(file) = inner.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn open_append(&self) -> io::Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    /// Moves the current file aside and reopens a fresh target. Returns the
    /// renamed backup, if any, for the caller to hand to [`finish_rotation`]
    /// once the writer lock is released.
    ///
    /// [`finish_rotation`]: RotatingWriter::finish_rotation
    fn rotate_locked(&self, inner: &mut Inner) -> io::Result<Option<PathBuf>> {
        inner.file = None;
        inner.size = 0;

        let backup = self.backup_path(Local::now());
        let rotated = match fs::rename(&self.path, &backup) {
            Ok(()) => Some(backup),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let (file, size) = self.open_append()?;
        inner.file = Some(file);
        inner.size = size;
        Ok(rotated)
    }

    /// Compression and retention for a freshly renamed backup, run without
    /// the writer lock held. Both are best effort; a failure leaves the
    /// plain backup in place.
    fn finish_rotation(&self, backup: &Path) {
        if self.compress == Compression::Gzip {
            let _ = compress_backup(backup);
        }
        self.prune_backups();
    }

    fn backup_path(&self, now: DateTime<Local>) -> PathBuf {
        let timestamp = now.format(BACKUP_TIMESTAMP_FORMAT);
        self.path.with_file_name(format!(
            "{}{timestamp}{}",
            self.backup_prefix, self.backup_suffix
        ))
    }

    /// Extracts the rotation timestamp from a backup file name, or `None`
    /// for files this writer did not produce.
    fn parse_backup_timestamp(&self, file_name: &str) -> Option<NaiveDateTime> {
        let rest = file_name.strip_prefix(&self.backup_prefix)?;
        let timestamp = rest
            .strip_suffix(".gz")
            .unwrap_or(rest)
            .strip_suffix(&self.backup_suffix)?;
        NaiveDateTime::parse_from_str(timestamp, BACKUP_TIMESTAMP_FORMAT).ok()
    }

    fn list_backups(&self) -> Vec<(NaiveDateTime, PathBuf)> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let Ok(entries) = fs::read_dir(parent) else {
            return Vec::new();
        };
        let mut backups = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(timestamp) = self.parse_backup_timestamp(name) {
                backups.push((timestamp, entry.path()));
            }
        }
        backups
    }

    fn prune_backups(&self) {
        if self.max_backups <= 0 && self.max_age_days <= 0 {
            return;
        }
        let mut backups = self.list_backups();
        backups.sort_by(|a, b| b.0.cmp(&a.0));

        let mut doomed = Vec::new();
        if self.max_backups > 0 {
            let keep = usize::try_from(self.max_backups).unwrap_or(usize::MAX);
            if backups.len() > keep {
                doomed.extend(backups.split_off(keep));
            }
        }
        if self.max_age_days > 0 {
            let cutoff = chrono::Duration::try_days(self.max_age_days)
                .and_then(|age| Local::now().naive_local().checked_sub_signed(age));
            if let Some(cutoff) = cutoff {
                doomed.extend(backups.into_iter().filter(|(ts, _)| *ts < cutoff));
            }
        }
        for (_, path) in doomed {
            let _ = fs::remove_file(path);
        }
    }
}

/// Gzips `path` into `<path>.gz` and removes the original.
fn compress_backup(path: &Path) -> io::Result<()> {
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    let gz_path = PathBuf::from(gz_path);

    let mut source = File::open(path)?;
    let target = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(target, flate2::Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)?;
    Ok(())
}

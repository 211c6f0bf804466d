//! HTTP batch sink.
//!
//! Records are enqueued on a bounded channel and shipped by a dedicated
//! worker task as JSON array batches. The write path never blocks: when the
//! queue is full the record is dropped and the caller told so. Delivery is
//! best-effort with linear-backoff retries; a batch that cannot be delivered
//! after all attempts is discarded and logged.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::dsn::HttpOptions;
use crate::error::{AdaptorError, WriteError};

/// Hard per-attempt deadline, applied whether or not the client carries its
/// own request timeout.
const POST_DEADLINE: Duration = Duration::from_secs(10);

const FLUSH_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
enum ShipError {
    #[error("no response within {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
}

/// Non-blocking sink that batches records and POSTs them to a collector.
///
/// Construction spawns the worker on the ambient Tokio runtime. Dropping the
/// sink without [`HttpSink::close`] still terminates the worker (the queue
/// closes), but only `close` waits for the final flush.
#[derive(Debug)]
pub struct HttpSink {
    sender: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
    closed: AtomicBool,
    dropped: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HttpSink {
    pub fn new(options: &HttpOptions) -> Result<HttpSink, AdaptorError> {
        if options.base_url.is_empty() {
            return Err(AdaptorError::EmptyUrl);
        }

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90));
        if !options.timeout.is_zero() {
            builder = builder.timeout(options.timeout);
        }
        if options.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;

        let (sender, receiver) = mpsc::channel(options.buffer_size.max(1));
        let cancel = CancellationToken::new();
        let worker = Worker {
            client,
            url: options.base_url.clone(),
            batch_size: options.batch_size,
            max_retries: options.max_retries,
            receiver,
            cancel: cancel.clone(),
        };

        Ok(HttpSink {
            sender,
            cancel,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            worker: Mutex::new(Some(tokio::spawn(worker.run()))),
        })
    }

    /// Enqueues one encoded record without blocking. Reports
    /// [`WriteError::BufferFull`] when the queue is at capacity (the record
    /// is dropped) and [`WriteError::Closed`] once shutdown has begun.
    pub fn write_record(&self, record: &[u8]) -> Result<(), WriteError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WriteError::Closed);
        }
        match self.sender.try_send(record.to_vec()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(WriteError::BufferFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WriteError::Closed),
        }
    }

    /// Records dropped so far because the queue was full.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting writes, signals the worker, and waits until it has
    /// flushed its pending partial batch. Later calls are no-ops.
    pub async fn close(&self) -> Result<(), WriteError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cancel.cancel();
        let handle = self.worker.lock().expect("lock poisoned").take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| WriteError::Io(io::Error::other(e)))?;
        }
        Ok(())
    }
}

struct Worker {
    client: reqwest::Client,
    url: String,
    batch_size: usize,
    max_retries: u32,
    receiver: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let mut batch: Vec<Vec<u8>> = Vec::new();
        let mut flush_interval = interval(FLUSH_TICK);
        flush_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        flush_interval.tick().await; // discard first tick, which is instantaneous

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                record = self.receiver.recv() => match record {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = flush_interval.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }
            }
        }

        // Records still sitting in the queue are dropped; only the batch
        // already pulled in-memory is flushed.
        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
    }

    async fn flush(&self, batch: &mut Vec<Vec<u8>>) {
        let payload = encode_batch(batch);
        let records = batch.len();
        batch.clear();

        for attempt in 0..=u64::from(self.max_retries) {
            match self.post(payload.clone()).await {
                Ok(()) => return,
                Err(e) => {
                    debug!(
                        "attempt {} to ship {records} records to {} failed: {e}",
                        attempt + 1,
                        self.url
                    );
                    if attempt < u64::from(self.max_retries) {
                        sleep(Duration::from_secs(attempt + 1)).await;
                    }
                }
            }
        }
        error!(
            "dropping batch of {records} records after {} failed attempts to {}",
            u64::from(self.max_retries) + 1,
            self.url
        );
    }

    async fn post(&self, payload: Vec<u8>) -> Result<(), ShipError> {
        let attempt = async {
            let response = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .body(payload)
                .send()
                .await?;
            let status = response.status();
            // Drain the body so the connection can return to the pool.
            let _ = response.bytes().await;
            Ok::<_, reqwest::Error>(status)
        };
        match timeout(POST_DEADLINE, attempt).await {
            Err(_) => Err(ShipError::DeadlineExceeded(POST_DEADLINE)),
            Ok(Err(e)) => Err(ShipError::Request(e)),
            Ok(Ok(status)) if status.as_u16() >= 400 => Err(ShipError::Status(status)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

/// Concatenates pre-encoded records into one JSON array, trimming stray
/// whitespace (such as the newline every fmt layer appends) from each.
fn encode_batch(batch: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(batch.iter().map(|r| r.len() + 1).sum::<usize>() + 2);
    payload.push(b'[');
    for (i, record) in batch.iter().enumerate() {
        if i > 0 {
            payload.push(b',');
        }
        payload.extend_from_slice(record.trim_ascii());
    }
    payload.push(b']');
    payload
}

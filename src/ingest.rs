//! The ingestion loop: stream source -> parse -> log -> upload -> evaluate
//! -> cooldown -> notify.
//!
//! Failure semantics per stage: parse failures are counted and dropped, sink
//! and notifier failures are logged and never abort the loop. The loop itself
//! terminates only on the shutdown signal or on [`SourceError`], which is the
//! one error allowed to propagate and take the process down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::cooldown::CooldownTracker;
use crate::log_sink::CsvLogSink;
use crate::models::{parse_line, Reading};
use crate::notify::{alert_message, Notifier};
use crate::thresholds::{evaluate, Thresholds};
use crate::upload::ThingSpeakUploader;

// ---

/// Cap on concurrently forwarding readings. Uploads are bounded by their own
/// timeout, so this only limits memory under a burst.
const MAX_IN_FLIGHT: usize = 8;

/// Pause after a loop-level failure before reading the next line.
const LOOP_BACKOFF: Duration = Duration::from_secs(1);

/// How long shutdown waits for in-flight uploads and notifications. These
/// are best-effort; whatever is still pending afterwards is abandoned.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Fatal stream source failure. Continuing without input is meaningless, so
/// this terminates the process.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source reached end of stream (device disconnected).
    #[error("stream source closed")]
    Closed,

    /// The source could not be read.
    #[error("stream source read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Throughput and drop counters, logged when the loop exits.
#[derive(Debug, Default)]
pub struct IngestStats {
    // ---
    lines: AtomicU64,
    readings: AtomicU64,
    parse_errors: AtomicU64,
}

impl IngestStats {
    // ---
    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn readings(&self) -> u64 {
        self.readings.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }
}

// ---

/// Drives the full pipeline over a line-delimited byte source.
///
/// The source is any [`AsyncRead`]; production wires in the serial device,
/// tests drive the loop from in-memory buffers.
#[derive(Clone)]
pub struct Ingestor {
    // ---
    log: CsvLogSink,
    uploader: ThingSpeakUploader,
    notifier: Notifier,
    thresholds: Thresholds,
    cooldown: Arc<CooldownTracker>,
    read_timeout: Duration,
    stats: Arc<IngestStats>,
}

impl Ingestor {
    // ---
    pub fn new(
        log: CsvLogSink,
        uploader: ThingSpeakUploader,
        notifier: Notifier,
        thresholds: Thresholds,
        cooldown: Arc<CooldownTracker>,
        read_timeout: Duration,
    ) -> Self {
        Ingestor {
            log,
            uploader,
            notifier,
            thresholds,
            cooldown,
            read_timeout,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` resolves or the source fails.
    ///
    /// The log append is awaited in the loop itself, so every accepted
    /// reading is durably written (or its failure logged) before the next
    /// line is read; upload and alerting run as background tasks and are
    /// drained within [`DRAIN_GRACE`] on exit.
    pub async fn run<R, F>(&self, source: R, shutdown: F) -> Result<(), SourceError>
    where
        R: AsyncRead + Unpin,
        F: std::future::Future<Output = ()>,
    {
        // ---
        let mut reader = BufReader::new(source);
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut buf: Vec<u8> = Vec::new();
        tokio::pin!(shutdown);

        let result = loop {
            // Reap finished tasks; a panic in one is a loop-level failure.
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "forwarding task failed");
                    tokio::time::sleep(LOOP_BACKOFF).await;
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    break Ok(());
                }
                read = timeout(self.read_timeout, reader.read_until(b'\n', &mut buf)) => {
                    match read {
                        // Source is silent; partial data stays in `buf`.
                        Err(_) => continue,
                        Ok(Err(e)) => break Err(SourceError::Io(e)),
                        Ok(Ok(0)) => break Err(SourceError::Closed),
                        Ok(Ok(_)) => {}
                    }

                    let line = decode_lossy(&buf);
                    buf.clear();
                    self.handle_line(line.trim(), &mut tasks).await;
                }
            }
        };

        self.drain(tasks).await;
        tracing::info!(
            lines = self.stats.lines(),
            readings = self.stats.readings(),
            parse_errors = self.stats.parse_errors(),
            "ingestion loop stopped"
        );
        result
    }

    async fn handle_line(&self, line: &str, tasks: &mut JoinSet<()>) {
        // ---
        if line.is_empty() {
            return;
        }
        self.stats.lines.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(raw = line, "received line");

        let reading = match parse_line(line) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, raw = line, "dropping unparseable line");
                return;
            }
        };
        self.stats.readings.fetch_add(1, Ordering::Relaxed);

        // Ingestion timestamp is assigned here, not by the source.
        let at = Utc::now();

        // The durable write happens in the loop, in arrival order; a failure
        // is logged and the reading still moves on to the best-effort path.
        if let Err(e) = self.log.append(at, &reading).await {
            tracing::error!(error = %e, "failed to log reading");
        }

        while tasks.len() >= MAX_IN_FLIGHT {
            if let Some(Err(e)) = tasks.join_next().await {
                tracing::error!(error = %e, "forwarding task failed");
                tokio::time::sleep(LOOP_BACKOFF).await;
            }
        }

        let stage = self.clone();
        tasks.spawn(async move { stage.forward_and_alert(reading, at).await });
    }

    /// Best-effort tail of the pipeline: forward the reading, then evaluate
    /// and alert. Runs after the log attempt, off the reader loop, so a slow
    /// remote cannot delay ingestion of the next line.
    async fn forward_and_alert(&self, reading: Reading, at: DateTime<Utc>) {
        // ---
        if let Err(e) = self.uploader.upload(&reading).await {
            tracing::warn!(error = %e, "failed to forward reading");
        }

        for event in evaluate(&reading, at, &self.thresholds) {
            if !self.cooldown.should_send(event.parameter, Instant::now()) {
                tracing::debug!(parameter = event.parameter, "alert suppressed by cooldown");
                continue;
            }

            let (subject, body) = alert_message(&event, &reading);
            match self.notifier.notify(&subject, &body).await {
                Ok(sent) => {
                    if sent {
                        tracing::info!(parameter = event.parameter, value = event.value, "alert sent");
                    }
                    // Alerting disabled also keeps the slot: dropped by
                    // configuration is not a delivery failure.
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        parameter = event.parameter,
                        "alert delivery failed, releasing cooldown slot"
                    );
                    self.cooldown.reset(event.parameter);
                }
            }
        }
    }

    async fn drain(&self, mut tasks: JoinSet<()>) {
        // ---
        if tasks.is_empty() {
            return;
        }
        tracing::info!(in_flight = tasks.len(), "draining in-flight forwarding tasks");

        let drained = timeout(DRAIN_GRACE, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "forwarding task failed during drain");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!("drain grace period elapsed, abandoning remaining tasks");
            tasks.abort_all();
        }
    }
}

/// Decode a raw line, dropping undecodable bytes.
///
/// Serial links pick up electrical noise; a corrupt byte must cost at most
/// the characters it garbles, never the whole line.
fn decode_lossy(bytes: &[u8]) -> String {
    // ---
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect()
}

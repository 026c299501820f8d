//! Append-only CSV stores for readings and raw server payloads.
//!
//! Both sinks share the same durability contract: the store (and its parent
//! directory) is created with a header row on first write, and later process
//! restarts detect the existing file and append without touching the header.
//! Rows are never rewritten or compacted.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::Reading;

// ---

/// Failure while appending to a CSV store.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Filesystem-level failure (disk full, permission denied, ...).
    #[error("log store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Row serialization failure.
    #[error("log store write error: {0}")]
    Csv(#[from] csv::Error),

    /// The blocking write task was cancelled or panicked.
    #[error("log store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Create-if-missing append of a single record.
///
/// The header is written only when the file does not exist yet, before the
/// first data row.
fn append_record<R: Serialize>(path: &Path, header: &[&str], record: R) -> Result<(), LogError> {
    // ---
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if write_header {
        writer.write_record(header)?;
    }
    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

// ---

/// Durable store for parsed readings: one row per reading, columns
/// `timestamp,waterLevel,pH,dhtTemp,dhtHum,dsTemp,turbidity,chlorine`.
///
/// Clones share one write lock, so concurrent appenders cannot interleave
/// rows or both write the header.
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    // ---
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

const READING_HEADER: [&str; 8] = [
    "timestamp",
    "waterLevel",
    "pH",
    "dhtTemp",
    "dhtHum",
    "dsTemp",
    "turbidity",
    "chlorine",
];

impl CsvLogSink {
    // ---
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvLogSink {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reading with its ingestion timestamp.
    ///
    /// Absent fields become empty cells so the column layout stays fixed.
    pub async fn append(&self, at: DateTime<Utc>, reading: &Reading) -> Result<(), LogError> {
        // ---
        let path = self.path.clone();
        let row = (
            at.to_rfc3339(),
            reading.water_level,
            reading.ph,
            reading.dht_temp,
            reading.dht_hum,
            reading.ds_temp,
            reading.turbidity,
            reading.chlorine,
        );

        let _guard = self.write_lock.lock().await;
        tokio::task::spawn_blocking(move || append_record(&path, &READING_HEADER, row)).await?
    }
}

// ---

/// Durable store for the secondary HTTP ingestion path: one row per payload,
/// columns `timestamp,data`. Request handlers run concurrently, so appends
/// are serialized the same way as [`CsvLogSink`].
#[derive(Debug, Clone)]
pub struct PayloadLogSink {
    // ---
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

const PAYLOAD_HEADER: [&str; 2] = ["timestamp", "data"];

impl PayloadLogSink {
    // ---
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PayloadLogSink {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one raw payload, stored verbatim as a single cell.
    pub async fn append(&self, at: DateTime<Utc>, payload: String) -> Result<(), LogError> {
        // ---
        let path = self.path.clone();
        let row = (at.to_rfc3339(), payload);

        let _guard = self.write_lock.lock().await;
        tokio::task::spawn_blocking(move || append_record(&path, &PAYLOAD_HEADER, row)).await?
    }
}

//! Water quality telemetry ingestion, logging and alerting.
//!
//! The pipeline reads line-delimited JSON readings from a serial link,
//! appends each reading to an append-only CSV store, forwards it best-effort
//! to a remote telemetry endpoint, and emails rate-limited alerts when
//! readings cross safety thresholds. A secondary HTTP endpoint ingests
//! arbitrary JSON payloads into a separate store, and the `calibrate` binary
//! fits sensor calibrations offline.

pub mod calib;
pub mod config;
pub mod cooldown;
pub mod ingest;
pub mod log_sink;
pub mod models;
pub mod notify;
pub mod routes;
pub mod thresholds;
pub mod upload;

pub use config::Config;

// These are re-exported for the binary and integration tests, so neither
// needs knowledge of the crate's module layout.
pub use cooldown::CooldownTracker;
pub use ingest::Ingestor;
pub use log_sink::{CsvLogSink, PayloadLogSink};
pub use models::Reading;
pub use notify::Notifier;
pub use thresholds::Thresholds;
pub use upload::ThingSpeakUploader;

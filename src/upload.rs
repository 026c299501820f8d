//! Best-effort forwarding of readings to a ThingSpeak-style endpoint.

use std::time::Duration;

use reqwest::StatusCode;

use crate::models::Reading;

// ---

/// Bound on a single upload request, connect included. A hung remote must
/// not stall ingestion of the next reading.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single upload attempt. The reading is not retried.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transport-level failure, including the request timeout.
    #[error("telemetry endpoint transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("telemetry endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Uploads readings to the remote telemetry endpoint, one attempt each.
#[derive(Debug, Clone)]
pub struct ThingSpeakUploader {
    // ---
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ThingSpeakUploader {
    // ---
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        // ---
        let client = reqwest::Client::builder().timeout(UPLOAD_TIMEOUT).build()?;

        Ok(ThingSpeakUploader {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Forward one reading. Single attempt, no queue: a missed upload is
    /// simply lost, the system favors freshness over completeness.
    pub async fn upload(&self, reading: &Reading) -> Result<(), RemoteError> {
        // ---
        if self.api_key.is_empty() {
            tracing::debug!("no ThingSpeak API key configured, skipping upload");
            return Ok(());
        }

        let response = self
            .client
            .get(&self.url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(&field_params(reading))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%status, "reading forwarded to telemetry endpoint");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Status { status, body })
        }
    }
}

/// Map present reading fields to their fixed ThingSpeak slots.
///
/// Slot order is part of the channel contract: field1..field7 carry
/// waterLevel, pH, dhtTemp, dhtHum, dsTemp, turbidity, chlorine. Absent
/// fields are omitted from the request entirely.
fn field_params(reading: &Reading) -> Vec<(&'static str, f64)> {
    // ---
    let slots = [
        ("field1", reading.water_level),
        ("field2", reading.ph),
        ("field3", reading.dht_temp),
        ("field4", reading.dht_hum),
        ("field5", reading.ds_temp),
        ("field6", reading.turbidity),
        ("field7", reading.chlorine),
    ];

    slots
        .into_iter()
        .filter_map(|(slot, value)| value.map(|v| (slot, v)))
        .collect()
}

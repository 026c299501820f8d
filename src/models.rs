//! Data model for the sensor pipeline.

use serde::{Deserialize, Serialize};

// ---

/// One structured reading from the sensor board.
///
/// Every field is independently optional: a board with no chlorine probe
/// simply never sends `chlorine`, and downstream stages must be able to tell
/// "sensor absent" apart from a legitimate zero. Unknown fields in the wire
/// payload are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    // ---
    #[serde(rename = "waterLevel", skip_serializing_if = "Option::is_none")]
    pub water_level: Option<f64>,

    #[serde(rename = "pH", skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,

    #[serde(rename = "dhtTemp", skip_serializing_if = "Option::is_none")]
    pub dht_temp: Option<f64>,

    #[serde(rename = "dhtHum", skip_serializing_if = "Option::is_none")]
    pub dht_hum: Option<f64>,

    #[serde(rename = "dsTemp", skip_serializing_if = "Option::is_none")]
    pub ds_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chlorine: Option<f64>,
}

/// Raised when a line is not a well-formed reading payload.
#[derive(Debug, thiserror::Error)]
#[error("malformed reading: {0}")]
pub struct ParseError(#[from] serde_json::Error);

// ---

/// Parse one raw line into a [`Reading`].
///
/// The caller is expected to have dropped empty/whitespace-only lines
/// already; anything that reaches this function and is not a JSON object of
/// numeric fields is a [`ParseError`] for the caller to log and discard.
pub fn parse_line(line: &str) -> Result<Reading, ParseError> {
    // ---
    Ok(serde_json::from_str(line)?)
}

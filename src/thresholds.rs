//! Safety threshold table and reading evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Reading;

// ---

/// Allowed ranges per water-quality parameter.
///
/// Loaded once at startup and shared read-only across all readings. Values
/// exactly at a bound are in range; alerts fire strictly below a minimum or
/// strictly above a maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    // ---
    pub ph_min: f64,
    pub ph_max: f64,
    pub turbidity_max: f64,
    pub chlorine_min: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        // ---
        Thresholds {
            ph_min: 6.5,
            ph_max: 7.5,
            turbidity_max: 700.0,
            chlorine_min: 300.0,
            humidity_min: 30.0,
            humidity_max: 70.0,
        }
    }
}

/// A single out-of-range observation, ready for the cooldown/notify path.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    // ---
    /// Parameter name; also the cooldown key.
    pub parameter: &'static str,
    /// The offending measured value.
    pub value: f64,
    /// Ingestion timestamp of the reading that produced this event.
    pub at: DateTime<Utc>,
}

// ---

/// Evaluate a reading against the threshold table.
///
/// Checks run in a fixed order (pH, turbidity, chlorine, humidity) so output
/// is deterministic; absent fields produce no event. Pure function, no I/O.
pub fn evaluate(reading: &Reading, at: DateTime<Utc>, thresholds: &Thresholds) -> Vec<AlertEvent> {
    // ---
    let mut events = Vec::new();

    if let Some(ph) = reading.ph {
        if ph < thresholds.ph_min || ph > thresholds.ph_max {
            events.push(AlertEvent {
                parameter: "pH",
                value: ph,
                at,
            });
        }
    }

    if let Some(turbidity) = reading.turbidity {
        if turbidity > thresholds.turbidity_max {
            events.push(AlertEvent {
                parameter: "turbidity",
                value: turbidity,
                at,
            });
        }
    }

    if let Some(chlorine) = reading.chlorine {
        if chlorine < thresholds.chlorine_min {
            events.push(AlertEvent {
                parameter: "chlorine",
                value: chlorine,
                at,
            });
        }
    }

    if let Some(humidity) = reading.dht_hum {
        if humidity < thresholds.humidity_min || humidity > thresholds.humidity_max {
            events.push(AlertEvent {
                parameter: "humidity",
                value: humidity,
                at,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::parse_line;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn in_range_reading_produces_no_events() {
        // ---
        let reading = parse_line(r#"{"pH":7.0,"turbidity":100}"#).unwrap();
        let events = evaluate(&reading, now(), &Thresholds::default());
        assert!(events.is_empty());
    }

    #[test]
    fn low_ph_alerts() {
        // ---
        let reading = parse_line(r#"{"pH":5.0}"#).unwrap();
        let events = evaluate(&reading, now(), &Thresholds::default());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].parameter, "pH");
        assert_eq!(events[0].value, 5.0);
    }

    #[test]
    fn boundary_values_are_safe() {
        // ---
        let t = Thresholds::default();

        let reading = parse_line(r#"{"pH":6.5,"dhtHum":70.0,"turbidity":700,"chlorine":300}"#).unwrap();
        assert!(evaluate(&reading, now(), &t).is_empty());

        let reading = parse_line(r#"{"pH":7.5,"dhtHum":30.0}"#).unwrap();
        assert!(evaluate(&reading, now(), &t).is_empty());
    }

    #[test]
    fn absent_fields_are_not_evaluated() {
        // ---
        // chlorine_min is 300, but a reading with no chlorine probe is fine.
        let reading = parse_line(r#"{"waterLevel":50}"#).unwrap();
        assert!(evaluate(&reading, now(), &Thresholds::default()).is_empty());
    }

    #[test]
    fn events_come_out_in_fixed_order() {
        // ---
        let reading =
            parse_line(r#"{"chlorine":10,"dhtHum":95.0,"pH":9.9,"turbidity":900}"#).unwrap();
        let events = evaluate(&reading, now(), &Thresholds::default());

        let order: Vec<&str> = events.iter().map(|e| e.parameter).collect();
        assert_eq!(order, vec!["pH", "turbidity", "chlorine", "humidity"]);
    }

    #[test]
    fn evaluation_is_repeatable() {
        // ---
        let reading = parse_line(r#"{"pH":5.0,"turbidity":900}"#).unwrap();
        let at = now();
        let t = Thresholds::default();

        assert_eq!(evaluate(&reading, at, &t), evaluate(&reading, at, &t));
    }
}

//! Secondary HTTP ingestion path.
//!
//! `POST /ingest` accepts an arbitrary JSON payload and appends
//! `(timestamp, payload)` to its own CSV store. This path is independent of
//! the serial pipeline: no parsing into [`crate::models::Reading`], no
//! forwarding, no alerting.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::log_sink::PayloadLogSink;

// ---

pub fn router() -> Router<PayloadLogSink> {
    // ---
    Router::new().route("/ingest", post(handler))
}

async fn handler(
    State(sink): State<PayloadLogSink>,
    payload: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    // ---
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(error = %rejection, "rejecting non-JSON ingest payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid JSON"})),
            );
        }
    };

    if let Err(e) = sink.append(Utc::now(), payload.to_string()).await {
        error!(error = %e, "failed to append ingested payload");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "storage failure"})),
        );
    }

    (StatusCode::OK, Json(json!({"status": "ok"})))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn valid_payload_is_appended() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let sink = PayloadLogSink::new(dir.path().join("server_data.csv"));

        let response = handler(
            State(sink.clone()),
            Ok(Json(json!({"pH": 7.0, "note": "manual sample"}))),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let stored = std::fs::read_to_string(sink.path()).unwrap();
        let mut lines = stored.lines();
        assert_eq!(lines.next(), Some("timestamp,data"));
        assert!(lines.next().unwrap().contains("manual sample"));
    }

    #[tokio::test]
    async fn repeated_payloads_grow_the_store() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let sink = PayloadLogSink::new(dir.path().join("server_data.csv"));

        for _ in 0..3 {
            let response = handler(State(sink.clone()), Ok(Json(json!({"n": 1}))))
                .await
                .into_response();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let stored = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(stored.lines().count(), 4);
    }
}

// src/routes/health.rs
//! API health check endpoint for the aquamon service.
//!
//! Defines the `/health` route used by supervisors and CI to verify the
//! service is up and answering HTTP requests. Sibling module in the `routes`
//! directory: the gateway (`mod.rs`) merges this subrouter into the top-level
//! router so `main.rs` does not need to know about individual endpoints.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Deliberately lightweight: does not touch the log stores, the serial
/// device, or any remote service.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges cleanly with the gateway
/// router regardless of the state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

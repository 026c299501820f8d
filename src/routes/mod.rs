use axum::Router;

use crate::log_sink::PayloadLogSink;

mod health;
mod ingest;

// ---

pub fn router(sink: PayloadLogSink) -> Router {
    // ---
    Router::new()
        .merge(ingest::router())
        .merge(health::router())
        .with_state(sink)
}

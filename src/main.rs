//! Application entry point for the `aquamon` telemetry service.
//!
//! This binary orchestrates the full startup sequence for the water quality
//! pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the pipeline stages (log sink, uploader, notifier, cooldown)
//! - Serving the secondary HTTP ingestion endpoint via the `routes` gateway
//! - Opening the serial device and running the ingestion loop until
//!   shutdown (Ctrl-C) or a fatal source failure
//!
//! # Environment Variables
//! - Pipeline configuration: see [`aquamon::config::load_from_env`]
//! - `AQUAMON_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AQUAMON_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – force colored output on or off
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio_serial::SerialPortBuilderExt;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use aquamon::{
    config, routes, CooldownTracker, CsvLogSink, Ingestor, Notifier, PayloadLogSink,
    ThingSpeakUploader,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let log_sink = CsvLogSink::new(cfg.log_csv.clone());
    let uploader = ThingSpeakUploader::new(&cfg.thingspeak_url, &cfg.thingspeak_api_key)
        .context("failed to build telemetry upload client")?;
    let notifier = Notifier::new(cfg.smtp.clone(), cfg.alert_recipients.clone());
    if !notifier.is_enabled() {
        tracing::warn!("email alerting disabled: set EMAIL_USER, EMAIL_PASS and ALERT_RECIPIENTS");
    }
    let cooldown = Arc::new(CooldownTracker::new(cfg.alert_cooldown));

    let ingestor = Ingestor::new(
        log_sink,
        uploader,
        notifier,
        cfg.thresholds.clone(),
        cooldown,
        cfg.read_timeout,
    );

    // Secondary ingestion path, independent of the serial pipeline.
    let app = routes::router(PayloadLogSink::new(cfg.server_log.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
    tracing::info!("HTTP ingest listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server failed");
        }
    });

    tracing::info!("opening serial port {} @ {} baud", cfg.serial_port, cfg.baud_rate);
    let serial = tokio_serial::new(cfg.serial_port.clone(), cfg.baud_rate)
        .open_native_async()
        .with_context(|| format!("failed to open serial port '{}'", cfg.serial_port))?;

    // Give the board a moment to settle after the port toggles DTR.
    tokio::time::sleep(Duration::from_secs(2)).await;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    // Only a fatal source failure comes back as an error; it changes the
    // process exit status after the loop has drained its durable writes.
    ingestor
        .run(serial, shutdown)
        .await
        .context("stream source failed")?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AQUAMON_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AQUAMON_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("AQUAMON_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AQUAMON_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AQUAMON_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper_util=warn,lettre=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

//! End-to-end pipeline tests: drive the ingestion loop from an in-memory
//! byte source through real CSV sinks in a temp directory, with the remote
//! endpoint unreachable and alerting disabled.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use aquamon::ingest::SourceError;
use aquamon::{
    CooldownTracker, CsvLogSink, Ingestor, Notifier, ThingSpeakUploader, Thresholds,
};

// ---

fn test_ingestor(log_path: &std::path::Path) -> Ingestor {
    // ---
    // Port 9 is not listening, so every upload attempt fails; the pipeline
    // must keep logging and evaluating regardless.
    let uploader = ThingSpeakUploader::new("http://127.0.0.1:9/update", "TESTKEY").unwrap();
    let notifier = Notifier::new(None, Vec::new());

    Ingestor::new(
        CsvLogSink::new(log_path),
        uploader,
        notifier,
        Thresholds::default(),
        Arc::new(CooldownTracker::new(Duration::from_secs(600))),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn pipeline_logs_readings_and_isolates_sink_failures() -> anyhow::Result<()> {
    // ---
    let dir = tempfile::tempdir()?;
    let log_path = dir.path().join("logs/sensor_log.csv");
    let ingestor = test_ingestor(&log_path);
    let stats = ingestor.stats();

    // One clean reading, a blank line, a garbage line, and a noise-wrapped
    // reading with a pH breach.
    let mut source = Vec::new();
    source.extend_from_slice(b"{\"pH\":7.0,\"turbidity\":100}\n");
    source.extend_from_slice(b"\n");
    source.extend_from_slice(b"not json at all\n");
    source.extend_from_slice(b"\xff\xfe{\"pH\":5.0}\n");

    // The in-memory source hits EOF after the last line, which the loop
    // reports as a disconnected device.
    let result = ingestor.run(source.as_slice(), std::future::pending()).await;
    assert!(matches!(result, Err(SourceError::Closed)));

    // Store was created with the header row before the first data row, and
    // the garbage line produced no row.
    let stored = std::fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = stored.lines().collect();
    assert_eq!(
        lines[0],
        "timestamp,waterLevel,pH,dhtTemp,dhtHum,dsTemp,turbidity,chlorine"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains(",7.0,"));
    assert!(lines[2].contains(",5.0,"));

    // Upload failures were isolated: both readings were logged, the failed
    // line was counted, nothing crashed the loop.
    assert_eq!(stats.lines(), 3);
    assert_eq!(stats.readings(), 2);
    assert_eq!(stats.parse_errors(), 1);

    Ok(())
}

#[tokio::test]
async fn shutdown_drains_pending_log_writes() -> anyhow::Result<()> {
    // ---
    let dir = tempfile::tempdir()?;
    let log_path = dir.path().join("sensor_log.csv");
    let ingestor = test_ingestor(&log_path);

    let (mut tx, rx) = tokio::io::duplex(1024);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let runner = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move {
            ingestor
                .run(rx, async {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    tx.write_all(b"{\"pH\":7.1}\n").await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Writer half stays open, so this exit is the shutdown path, not EOF.
    stop_tx.send(()).ok();
    let result = runner.await?;
    assert!(result.is_ok());

    let stored = std::fs::read_to_string(&log_path)?;
    assert_eq!(stored.lines().count(), 2);
    assert!(stored.contains(",7.1,"));

    Ok(())
}

#[tokio::test]
async fn silent_source_does_not_end_the_loop() -> anyhow::Result<()> {
    // ---
    let dir = tempfile::tempdir()?;
    let ingestor = Ingestor::new(
        CsvLogSink::new(dir.path().join("sensor_log.csv")),
        ThingSpeakUploader::new("http://127.0.0.1:9/update", "").unwrap(),
        Notifier::new(None, Vec::new()),
        Thresholds::default(),
        Arc::new(CooldownTracker::new(Duration::from_secs(600))),
        Duration::from_millis(50),
    );

    // No data at all: the read timeout must keep the loop alive until the
    // shutdown signal, not error out.
    let (_tx, rx) = tokio::io::duplex(64);
    let result = ingestor
        .run(rx, tokio::time::sleep(Duration::from_millis(400)))
        .await;

    assert!(result.is_ok());
    Ok(())
}

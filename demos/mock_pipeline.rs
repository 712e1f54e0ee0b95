//! Mock Pipeline Example
//!
//! Feeds canned rtl_433 output through the matcher into a dry-run sink.
//! Runs without a radio or a CHORDS server.
//!
//! Run with: cargo run -p demos --bin mock_pipeline [-- demos/station.json]

use std::path::Path;
use std::sync::Arc;

use config_loader::ConfigLoader;
use dispatcher::LogSink;
use ingestion::{MockLineSource, StreamPipeline};
use matcher::MatchEngine;

const CAPTURE: &[&str] = &[
    r#"{"time":"2024-05-01 12:00:00","model":"Acurite-Tower","id":11524,"channel":"A","battery_ok":1,"temperature_C":18.3,"humidity":52}"#,
    r#"{"time":"2024-05-01 12:00:00","model":"Acurite-Tower","id":11524,"channel":"A","battery_ok":1,"temperature_C":18.3,"humidity":52}"#,
    r#"{"time":"2024-05-01 12:00:16","model":"Fineoffset-WH65B","id":94,"rain_mm":12.6,"wind_avg_m_s":1.4}"#,
    r#"{"time":"2024-05-01 12:00:20","model":"Acurite-Tower","id":2048,"temperature_C":21.0}"#,
    r#"{"time":"2024-05-01 12:00:31","model":"Acurite-Tower","id":11524,"channel":"A","battery_ok":1,"temperature_C":18.4,"humidity":52}"#,
    "rtl_433 version 23.11 (garbage on stdout)",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/station.json".to_string());
    tracing::info!(path = %path, "Loading station config");
    let config = Arc::new(ConfigLoader::load_from_path(Path::new(&path))?);

    let sink = LogSink::new("demo", config.chords_host.clone());
    let mut pipeline = StreamPipeline::new(MatchEngine::new(Arc::clone(&config)), sink);

    let mut source = MockLineSource::from_lines(CAPTURE.iter().copied());
    pipeline.run(&mut source).await?;

    let stats = pipeline.stats();
    tracing::info!(
        served = source.served(),
        lines = stats.lines,
        submitted = stats.submitted,
        duplicates = stats.duplicates,
        no_match = stats.no_match,
        decode_failed = stats.decode_failed,
        logged = pipeline.sink().logged(),
        "Demo finished"
    );

    Ok(())
}

//! Pipeline run implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{RecordSink, StationConfig};
use dispatcher::{drain, ChordsSink, LogSink, MetricsSnapshot};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::error::{load_config, CliError};
use crate::pipeline::{Pipeline, PipelineConfig};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Where records go
enum Output {
    Chords(Arc<ChordsSink>),
    DryRun(Arc<LogSink>),
}

impl Output {
    fn create(config: &StationConfig, dry_run: bool) -> Result<Self, CliError> {
        if dry_run {
            info!("Dry run mode - records will be logged, not uploaded");
            return Ok(Self::DryRun(Arc::new(LogSink::new(
                "dry-run",
                config.chords_host.clone(),
            ))));
        }
        let sink = ChordsSink::connect(config)
            .map_err(|e| CliError::sink_setup(&config.chords_host, e.to_string()))?;
        Ok(Self::Chords(Arc::new(sink)))
    }

    fn sink(&self) -> Arc<dyn RecordSink> {
        match self {
            Self::Chords(sink) => Arc::clone(sink) as Arc<dyn RecordSink>,
            Self::DryRun(sink) => Arc::clone(sink) as Arc<dyn RecordSink>,
        }
    }

    fn delivery_snapshot(&self) -> Option<MetricsSnapshot> {
        match self {
            Self::Chords(sink) => Some(sink.metrics().snapshot()),
            Self::DryRun(_) => None,
        }
    }

    /// Stop the delivery worker; returns the number of records left undelivered
    async fn close(self, pending: usize) -> usize {
        match self {
            Self::Chords(sink) => match Arc::try_unwrap(sink) {
                Ok(sink) if pending == 0 => {
                    sink.shutdown().await;
                    0
                }
                Ok(sink) => sink.abort(),
                Err(_) => pending,
            },
            Self::DryRun(_) => pending,
        }
    }
}

/// Execute the pipeline
pub async fn run_pipeline(cli: &Cli) -> Result<()> {
    info!(config = %cli.config.display(), "Loading configuration");

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    info!(
        host = %config.chords_host,
        sensors = config.smart_sensors.len(),
        enabled = config.enabled_sensors().count(),
        max_queue_length = config.max_queue_length,
        "Configuration loaded"
    );
    for warning in config_loader::collect_warnings(&config) {
        warn!("{}", warning);
    }

    let output = Output::create(&config, cli.dry_run)?;

    let pipeline_config = PipelineConfig {
        station: Arc::new(config),
        replay_path: cli.file.clone(),
        reset_dedup_on_restart: cli.reset_dedup,
    };

    match pipeline_config.replay_path {
        Some(ref path) => info!(path = %path.display(), "Running in REPLAY mode"),
        None => info!(
            decoder = %pipeline_config.station.decoder.path,
            "Running decoder until interrupted"
        ),
    }

    let pipeline = Pipeline::new(pipeline_config, output.sink());
    let mut stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    // Wait for all data to be sent
    let drain_timeout = cli.drain_timeout.map(Duration::from_secs);
    let pending = {
        let sink = output.sink();
        tokio::select! {
            remaining = drain(sink.as_ref(), DRAIN_POLL_INTERVAL, drain_timeout) => remaining,
            _ = shutdown_signal() => {
                let remaining = sink.pending();
                warn!(pending = remaining, "Second shutdown signal, exiting without draining");
                remaining
            }
        }
    };
    stats.delivery = output.delivery_snapshot();
    stats.undelivered = output.close(pending).await;

    stats.print_summary();
    info!("rtl2chords finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

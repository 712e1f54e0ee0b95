//! Pipeline orchestrator - sources, supervision and shutdown.
//!
//! Replay mode reads one file to its end. Live mode runs the decoder and
//! restarts it after `restart_delay_secs` whenever it exits or fails to
//! start, until the shutdown future resolves.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{RecordSink, StationConfig};
use ingestion::{open_replay_file, DecoderProcess, StreamPipeline};
use matcher::MatchEngine;
use tracing::{error, info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated station configuration
    pub station: Arc<StationConfig>,

    /// Replay decoder output from this file instead of running the decoder
    pub replay_path: Option<PathBuf>,

    /// Forget the previous reading on every decoder restart
    pub reset_dedup_on_restart: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline<K> {
    config: PipelineConfig,
    sink: K,
}

impl<K: RecordSink> Pipeline<K> {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig, sink: K) -> Self {
        Self { config, sink }
    }

    /// Run until end of input (replay) or until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        tokio::pin!(shutdown);

        let engine = MatchEngine::new(Arc::clone(&self.config.station));
        let mut stream = StreamPipeline::new(engine, self.sink);
        let mut stats = PipelineStats::default();

        match self.config.replay_path {
            Some(ref path) => {
                let mut source = open_replay_file(path)
                    .await
                    .with_context(|| format!("Failed to open replay file {}", path.display()))?;

                tokio::select! {
                    result = stream.run(&mut source) => {
                        result.with_context(|| format!("Failed reading {}", path.display()))?;
                    }
                    _ = shutdown.as_mut() => {
                        warn!("Received shutdown signal, stopping replay");
                        stats.interrupted = true;
                    }
                }
            }
            None => {
                supervise(
                    &self.config,
                    &mut stream,
                    &mut stats,
                    shutdown.as_mut(),
                )
                .await;
            }
        }

        stats.lines = stream.stats().clone();
        stats.duration = start_time.elapsed();

        info!(
            lines = stats.lines.lines,
            submitted = stats.lines.submitted,
            duration_secs = stats.duration.as_secs_f64(),
            "Input processing finished"
        );

        Ok(stats)
    }
}

/// Keep a decoder running until shutdown
async fn supervise<K, F>(
    config: &PipelineConfig,
    stream: &mut StreamPipeline<K>,
    stats: &mut PipelineStats,
    mut shutdown: Pin<&mut F>,
) where
    K: RecordSink,
    F: Future<Output = ()>,
{
    let decoder = &config.station.decoder;
    let restart_delay = Duration::from_secs(decoder.restart_delay_secs);

    loop {
        match DecoderProcess::spawn(decoder) {
            Ok(mut process) => {
                stats.decoder_starts += 1;
                tokio::select! {
                    result = stream.run(&mut process) => {
                        if let Err(e) = result {
                            error!(error = %e, "Decoder stopped");
                        }
                    }
                    _ = shutdown.as_mut() => {
                        warn!("Received shutdown signal, stopping decoder");
                        process.shutdown().await;
                        stats.interrupted = true;
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Something went wrong starting the decoder");
            }
        }

        stats.upstream_restarts += 1;
        observability::record_upstream_restart();
        if config.reset_dedup_on_restart {
            stream.reset_dedup();
        }

        info!(
            delay_secs = restart_delay.as_secs(),
            restarts = stats.upstream_restarts,
            "Restarting decoder"
        );
        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = shutdown.as_mut() => {
                warn!("Received shutdown signal while waiting to restart decoder");
                stats.interrupted = true;
                return;
            }
        }
    }
}

//! Pipeline statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use ingestion::LineStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Per-outcome line counters
    pub lines: LineStats,

    /// Decoder processes started (live mode)
    pub decoder_starts: u64,

    /// Decoder exits or spawn failures followed by a restart
    pub upstream_restarts: u64,

    /// Stopped by SIGINT/SIGTERM rather than end of input
    pub interrupted: bool,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Upload queue metrics (None in dry-run mode)
    pub delivery: Option<MetricsSnapshot>,

    /// Records still queued when the process gave up waiting
    pub undelivered: usize,
}

impl PipelineStats {
    /// Lines processed per second
    pub fn lines_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.lines.lines as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=================== rtl2chords summary ===================\n");

        println!("Overview");
        println!("   |- Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   |- Lines: {} ({:.2}/s)", self.lines.lines, self.lines_per_sec());
        if self.decoder_starts > 0 {
            println!("   |- Decoder starts: {}", self.decoder_starts);
        }
        println!("   |- Upstream restarts: {}", self.upstream_restarts);
        println!("   `- Interrupted: {}", if self.interrupted { "yes" } else { "no" });

        println!("\nLines");
        println!("   |- Submitted: {}", self.lines.submitted);
        println!("   |- Duplicates: {}", self.lines.duplicates);
        println!("   |- No match: {}", self.lines.no_match);
        println!("   |- No variables: {}", self.lines.no_variables);
        println!("   |- Decode failures: {}", self.lines.decode_failed);
        println!("   `- Submit failures: {}", self.lines.submit_failed);

        if let Some(ref delivery) = self.delivery {
            println!("\nDelivery");
            println!("   |- Delivered: {}", delivery.delivered);
            println!("   |- Failed attempts: {}", delivery.failures);
            println!("   |- Dropped (queue full): {}", delivery.dropped);
            println!("   |- Abandoned: {}", delivery.abandoned);
            println!("   |- Undelivered at exit: {}", self.undelivered);
            println!("   `- Latency (ms): {}", delivery.latency_ms);
        }

        println!();
    }
}

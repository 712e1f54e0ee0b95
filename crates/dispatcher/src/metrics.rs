//! Delivery queue metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use observability::{RunningStats, StatsSummary};

/// Metrics for one delivery queue
#[derive(Debug, Default)]
pub struct QueueMetrics {
    /// Records accepted but not yet delivered (queued + in flight)
    pending: AtomicUsize,
    /// Total successful deliveries
    delivered: AtomicU64,
    /// Total failed attempts (a record may fail several times)
    failures: AtomicU64,
    /// Records refused because the queue was full
    dropped: AtomicU64,
    /// Records given up on after exhausting retries
    abandoned: AtomicU64,
    /// Successful delivery latency (ms)
    latency_ms: Mutex<RunningStats>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn inc_pending(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub fn dec_pending(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Count a successful delivery and its latency
    pub fn record_delivered(&self, latency_ms: f64) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut stats) = self.latency_ms.lock() {
            stats.push(latency_ms);
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    pub fn inc_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency_ms = self
            .latency_ms
            .lock()
            .map(|stats| StatsSummary::from(&*stats))
            .unwrap_or_default();
        MetricsSnapshot {
            pending: self.pending(),
            delivered: self.delivered(),
            failures: self.failures(),
            dropped: self.dropped(),
            abandoned: self.abandoned(),
            latency_ms,
        }
    }
}

/// Snapshot of queue metrics (for reporting)
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub pending: usize,
    pub delivered: u64,
    pub failures: u64,
    pub dropped: u64,
    pub abandoned: u64,
    pub latency_ms: StatsSummary,
}

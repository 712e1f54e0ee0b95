//! DeliveryQueue - bounded queue with an isolated delivery worker
//!
//! `try_enqueue` never waits. The worker sends URIs strictly in order and
//! retries each one with exponential backoff before moving on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{ContractError, RecordSink};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::QueueMetrics;
use crate::transport::Transport;
use crate::uri::redact_uri;

/// Retry schedule for failed deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after the first failure
    pub initial_backoff: Duration,
    /// Upper bound on the wait between attempts
    pub max_backoff: Duration,
    /// None = retry until delivered
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th consecutive failure (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Handle to a running delivery worker
pub struct DeliveryQueue {
    name: String,
    tx: mpsc::Sender<Url>,
    metrics: Arc<QueueMetrics>,
    capacity: usize,
    worker_handle: JoinHandle<()>,
}

impl DeliveryQueue {
    /// Create the queue and spawn its worker on the current runtime
    pub fn spawn<T>(
        name: impl Into<String>,
        transport: T,
        capacity: usize,
        policy: RetryPolicy,
    ) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        let name = name.into();
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let metrics = Arc::new(QueueMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            delivery_worker(transport, rx, worker_metrics, policy, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            capacity,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of queued (not yet in flight) URIs
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }

    /// Records queued or in flight
    pub fn pending(&self) -> usize {
        self.metrics.pending()
    }

    /// Queue a URI without waiting
    ///
    /// # Errors
    /// `QueueFull` when the queue is at capacity (the URI is dropped), or
    /// `Delivery` when the worker is gone
    pub fn try_enqueue(&self, uri: Url) -> Result<(), ContractError> {
        self.metrics.inc_pending();
        match self.tx.try_send(uri) {
            Ok(()) => {
                observability::record_queue_pending(self.metrics.pending());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(uri)) => {
                self.metrics.dec_pending();
                self.metrics.inc_dropped();
                observability::record_record_dropped(&self.name);
                warn!(
                    queue = %self.name,
                    capacity = self.capacity,
                    dropped = self.metrics.dropped(),
                    uri = %redact_uri(&uri),
                    "Queue full, record dropped"
                );
                Err(ContractError::QueueFull {
                    sink_name: self.name.clone(),
                    max: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.dec_pending();
                error!(queue = %self.name, "Delivery worker closed unexpectedly");
                Err(ContractError::delivery(&self.name, "delivery worker stopped"))
            }
        }
    }

    /// Stop accepting records and wait for the worker to finish the backlog
    #[instrument(name = "delivery_queue_shutdown", skip(self), fields(queue = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(queue = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(queue = %self.name, "DeliveryQueue shutdown complete");
    }

    /// Stop immediately, discarding the backlog; returns the number discarded
    pub fn abort(self) -> usize {
        self.worker_handle.abort();
        let discarded = self.metrics.pending();
        if discarded > 0 {
            warn!(queue = %self.name, discarded, "Delivery queue aborted with records pending");
        }
        discarded
    }
}

/// Worker task that consumes URIs and delivers them through the transport
#[instrument(
    name = "delivery_worker_loop",
    skip(transport, rx, metrics, policy),
    fields(queue = %name)
)]
async fn delivery_worker<T>(
    transport: T,
    mut rx: mpsc::Receiver<Url>,
    metrics: Arc<QueueMetrics>,
    policy: RetryPolicy,
    name: String,
) where
    T: Transport + Sync,
{
    debug!(queue = %name, transport = transport.name(), "Delivery worker started");

    while let Some(uri) = rx.recv().await {
        deliver_with_retry(&transport, &uri, &metrics, &policy, &name).await;
        metrics.dec_pending();
        observability::record_queue_pending(metrics.pending());
    }

    debug!(queue = %name, "Delivery worker stopped");
}

async fn deliver_with_retry<T>(
    transport: &T,
    uri: &Url,
    metrics: &QueueMetrics,
    policy: &RetryPolicy,
    name: &str,
) -> bool
where
    T: Transport + Sync,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let started = Instant::now();
        let result = transport.deliver(uri).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(()) => {
                metrics.record_delivered(latency_ms);
                observability::record_delivery(true, latency_ms);
                debug!(queue = %name, attempt, latency_ms, "Record delivered");
                return true;
            }
            Err(e) => {
                metrics.inc_failures();
                observability::record_delivery(false, latency_ms);

                if policy.exhausted(attempt) {
                    metrics.inc_abandoned();
                    error!(
                        queue = %name,
                        attempt,
                        uri = %redact_uri(uri),
                        error = %e,
                        "Giving up on record"
                    );
                    return false;
                }

                let delay = policy.backoff(attempt);
                warn!(
                    queue = %name,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Delivery failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Wait until `sink` has nothing pending
///
/// Polls every `poll_interval`, logging the queue length each time. Returns
/// the number of records still pending (non-zero only when `timeout` ran out).
pub async fn drain<S>(sink: &S, poll_interval: Duration, timeout: Option<Duration>) -> usize
where
    S: RecordSink + ?Sized,
{
    let started = Instant::now();
    loop {
        let pending = sink.pending();
        info!(sink = sink.name(), pending, "Queue length");
        observability::record_queue_pending(pending);
        if pending == 0 {
            return 0;
        }
        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            warn!(sink = sink.name(), pending, "Drain timeout reached, records left undelivered");
            return pending;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

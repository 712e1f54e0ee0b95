//! ChordsSink - records to CHORDS through the delivery queue

use std::sync::Arc;

use contracts::{ContractError, RecordSink, StationConfig, TelemetryRecord};
use tracing::{info, instrument};

use crate::error::DispatcherError;
use crate::metrics::QueueMetrics;
use crate::queue::{DeliveryQueue, RetryPolicy};
use crate::transport::{HttpTransport, Transport};
use crate::uri::{build_record_uri, redact_uri};

/// Sink that uploads records to a CHORDS portal
pub struct ChordsSink {
    host: String,
    queue: DeliveryQueue,
}

impl ChordsSink {
    /// HTTP sink for the configured host, queue depth `max_queue_length`
    #[instrument(name = "chords_sink_new", skip(config), fields(host = %config.chords_host))]
    pub fn connect(config: &StationConfig) -> Result<Self, DispatcherError> {
        let transport = HttpTransport::new(HttpTransport::DEFAULT_TIMEOUT)?;
        Ok(Self::with_transport(config, transport, RetryPolicy::default()))
    }

    /// Sink over an arbitrary transport
    pub fn with_transport<T>(config: &StationConfig, transport: T, policy: RetryPolicy) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        let queue = DeliveryQueue::spawn("chords", transport, config.max_queue_length, policy);
        info!(
            host = %config.chords_host,
            max_queue_length = queue.capacity(),
            "ChordsSink started"
        );
        Self {
            host: config.chords_host.clone(),
            queue,
        }
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        self.queue.metrics()
    }

    /// Stop accepting records and wait for the backlog to be delivered
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }

    /// Stop now, discarding the backlog; returns the number discarded
    pub fn abort(self) -> usize {
        self.queue.abort()
    }
}

impl RecordSink for ChordsSink {
    fn name(&self) -> &str {
        self.queue.name()
    }

    fn submit(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
        let uri = build_record_uri(&self.host, record)
            .map_err(|e| ContractError::delivery(self.queue.name(), e.to_string()))?;
        info!(uri = %redact_uri(&uri), "Submitting");
        self.queue.try_enqueue(uri)
    }

    fn pending(&self) -> usize {
        self.queue.pending()
    }
}

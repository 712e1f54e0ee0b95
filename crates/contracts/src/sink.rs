//! RecordSink trait - delivery queue interface
//!
//! The match engine hands finished records to a sink and never waits for
//! network delivery.

use crate::{ContractError, TelemetryRecord};

/// Accepts records for best-effort delivery
pub trait RecordSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Enqueue a record and return immediately
    ///
    /// # Errors
    /// `QueueFull` when the queue is at its maximum depth, or a delivery error
    /// if the sink can no longer accept records
    fn submit(&self, record: &TelemetryRecord) -> Result<(), ContractError>;

    /// Records accepted but not yet delivered
    fn pending(&self) -> usize;
}

impl<T: RecordSink + ?Sized> RecordSink for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn submit(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
        (**self).submit(record)
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }
}

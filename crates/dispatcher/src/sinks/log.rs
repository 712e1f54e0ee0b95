//! LogSink - logs what would be uploaded (dry run)

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, RecordSink, TelemetryRecord};
use tracing::info;

use crate::uri::{build_record_uri, redact_uri};

/// Sink that logs record URIs instead of sending them
pub struct LogSink {
    name: String,
    host: String,
    logged: AtomicU64,
}

impl LogSink {
    /// Create a new LogSink rendering URIs against `host`
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            logged: AtomicU64::new(0),
        }
    }

    /// Records logged so far
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
        let uri = build_record_uri(&self.host, record)
            .map_err(|e| ContractError::delivery(&self.name, e.to_string()))?;
        self.logged.fetch_add(1, Ordering::Relaxed);
        info!(
            sink = %self.name,
            instrument_id = %record.instrument_id,
            measurements = record.measurement_count(),
            uri = %redact_uri(&uri),
            "Dry run, not submitting"
        );
        Ok(())
    }

    fn pending(&self) -> usize {
        0
    }
}

//! Timestamp resolution and record assembly.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use contracts::{Credentials, InstrumentId, Reading, StationConfig, TelemetryRecord, AT_VARIABLE};
use serde_json::Value;
use tracing::{error, warn};

/// Field carrying the decoder's own timestamp
const TIME_FIELD: &str = "time";

/// Naive layouts accepted for `time`, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Layouts with an explicit offset that RFC 3339 does not cover
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Where a record timestamp came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampSource {
    /// Parsed from the reading's `time` field
    Reading,
    /// No `time` field, wall clock used
    Missing,
    /// `time` present but unparsable, wall clock used
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    /// Epoch seconds
    pub epoch_secs: i64,
    pub source: TimestampSource,
}

/// Pick the record timestamp for a reading
///
/// Falls back to `now` when `time` is absent (warning) or unparsable (error).
pub fn resolve_timestamp(reading: &Reading, now: DateTime<Utc>) -> ResolvedTimestamp {
    let Some(raw) = reading.get(TIME_FIELD) else {
        warn!("No timestamp in data, using current time");
        return ResolvedTimestamp {
            epoch_secs: now.timestamp(),
            source: TimestampSource::Missing,
        };
    };

    match parse_time(raw) {
        Ok(epoch_secs) => ResolvedTimestamp {
            epoch_secs,
            source: TimestampSource::Reading,
        },
        Err(reason) => {
            error!(time = %raw, reason = %reason, "Failed to parse timestamp, using current time");
            ResolvedTimestamp {
                epoch_secs: now.timestamp(),
                source: TimestampSource::Invalid(reason),
            }
        }
    }
}

/// Parse an ISO-8601 `time` value into epoch seconds
///
/// Values without an offset are taken as UTC. Fractional seconds are dropped.
pub fn parse_time(value: &Value) -> Result<i64, String> {
    let raw = match value {
        Value::String(s) => s.trim(),
        other => return Err(format!("expected a string, got {other}")),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Ok(dt.timestamp());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ndt.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(ndt.and_utc().timestamp());
        }
    }

    Err(format!("unrecognized time format '{raw}'"))
}

/// Assemble a record for the endpoint
///
/// Returns `None` when nothing was extracted or no instrument can be
/// resolved. The synthetic `at` variable always equals `timestamp`.
pub fn build_record(
    config: &StationConfig,
    timestamp: i64,
    variables: BTreeMap<String, Value>,
    instrument_override: Option<&InstrumentId>,
) -> Option<TelemetryRecord> {
    if variables.is_empty() {
        return None;
    }
    let instrument_id = instrument_override.or(config.instrument_id.as_ref())?.clone();

    let mut variables = variables;
    variables.insert(AT_VARIABLE.to_string(), Value::from(timestamp));

    Some(TelemetryRecord {
        instrument_id,
        credentials: Credentials {
            api_email: config.api_email.clone(),
            api_key: config.api_key.clone(),
        },
        timestamp,
        variables,
    })
}

//! MatchEngine - reading in, record (or reason for none) out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{Reading, StationConfig, TelemetryRecord};
use tracing::{debug, instrument, warn};

use crate::builder::{build_record, resolve_timestamp, TimestampSource};
use crate::matching::find_match;

/// Result of evaluating one reading
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// No enabled sensor matched
    NoMatch,
    /// A sensor matched but none of its source fields were present
    NoVariables { sensor: String },
    /// A record is ready for submission
    Record {
        sensor: String,
        record: TelemetryRecord,
        timestamp_source: TimestampSource,
    },
}

/// Matches readings against an immutable catalogue and builds records
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: Arc<StationConfig>,
}

impl MatchEngine {
    /// Create a new engine over a validated configuration
    pub fn new(config: Arc<StationConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Evaluate a reading using the wall clock for timestamp fallback
    pub fn evaluate(&self, reading: &Reading) -> Evaluation {
        self.evaluate_at(reading, Utc::now())
    }

    /// Evaluate a reading with an explicit fallback time
    #[instrument(name = "match_engine_evaluate", skip_all)]
    pub fn evaluate_at(&self, reading: &Reading, now: DateTime<Utc>) -> Evaluation {
        let Some(found) = find_match(reading, &self.config.smart_sensors) else {
            debug!("No configured sensor matches reading");
            return Evaluation::NoMatch;
        };

        let sensor = found.sensor.label();
        if !found.has_variables() {
            warn!(sensor = %sensor, "Matched sensor yielded no variables, nothing to send");
            return Evaluation::NoVariables { sensor };
        }

        let timestamp = resolve_timestamp(reading, now);
        let instrument = self.config.instrument_for(found.sensor);
        match build_record(&self.config, timestamp.epoch_secs, found.variables, instrument) {
            Some(record) => Evaluation::Record {
                sensor,
                record,
                timestamp_source: timestamp.source,
            },
            None => {
                // Validation guarantees an instrument for every enabled sensor
                warn!(sensor = %sensor, "No instrument id for matched sensor");
                Evaluation::NoMatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::{DecoderConfig, InstrumentId, SensorDefinition, VariableMapping};
    use serde_json::{json, Value};

    fn engine() -> MatchEngine {
        let sensor = SensorDefinition {
            name: Some("yard".into()),
            enabled: true,
            match_criteria: serde_json::from_value(json!({"model": "X", "id": 1})).unwrap(),
            instrument_id: None,
            variables: vec![VariableMapping::new("temperature", "tempC")],
        };
        MatchEngine::new(Arc::new(StationConfig {
            chords_host: "chords.example.org".into(),
            api_email: "ops@example.org".into(),
            api_key: "k".into(),
            instrument_id: Some(InstrumentId::from(2u64)),
            max_queue_length: 10,
            decoder: DecoderConfig::default(),
            smart_sensors: vec![sensor],
        }))
    }

    fn reading(value: Value) -> Reading {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reference_reading_produces_record() {
        let r = reading(json!({
            "model": "X", "id": 1, "temperature": 21.5, "time": "2024-01-01T00:00:00"
        }));
        let Evaluation::Record { sensor, record, timestamp_source } = engine().evaluate(&r) else {
            panic!("expected a record");
        };
        assert_eq!(sensor, "yard");
        assert_eq!(timestamp_source, TimestampSource::Reading);
        assert_eq!(record.timestamp, 1_704_067_200);
        let expected: std::collections::BTreeMap<String, Value> =
            [("at".to_string(), json!(1_704_067_200)), ("tempC".to_string(), json!(21.5))].into();
        assert_eq!(record.variables, expected);
        assert_eq!(record.instrument_id, "2");
    }

    #[test]
    fn test_missing_time_uses_fallback() {
        let now = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        let r = reading(json!({"model": "X", "id": 1, "temperature": 3}));
        match engine().evaluate_at(&r, now) {
            Evaluation::Record { record, timestamp_source, .. } => {
                assert_eq!(timestamp_source, TimestampSource::Missing);
                assert_eq!(record.variables.get("at"), Some(&json!(now.timestamp())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_variables() {
        let r = reading(json!({"model": "X", "id": 1, "humidity": 3}));
        assert_eq!(
            engine().evaluate(&r),
            Evaluation::NoVariables { sensor: "yard".into() }
        );
    }

    #[test]
    fn test_no_match() {
        let r = reading(json!({"model": "Y", "id": 1, "temperature": 3}));
        assert_eq!(engine().evaluate(&r), Evaluation::NoMatch);
    }
}

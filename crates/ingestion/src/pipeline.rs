//! Stream Pipeline main entry
//!
//! One line at a time: decode -> dedup -> match -> build record -> submit.
//! A failing line never stops the stream.

use chrono::{DateTime, Utc};
use contracts::{ContractError, LineSource, Reading, RecordSink};
use matcher::{Deduplicator, Evaluation, MatchEngine};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

/// What happened to one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineOutcome {
    /// Not UTF-8, not JSON, or not a JSON object
    DecodeFailed,
    /// Identical to the previous reading
    Duplicate,
    /// No enabled sensor matched
    NoMatch,
    /// Matched, but none of the mapped fields were present
    NoVariables,
    /// Record handed to the sink
    Submitted,
    /// The sink refused the record
    SubmitFailed,
}

impl LineOutcome {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecodeFailed => "decode_failed",
            Self::Duplicate => "duplicate",
            Self::NoMatch => "no_match",
            Self::NoVariables => "no_variables",
            Self::Submitted => "submitted",
            Self::SubmitFailed => "submit_failed",
        }
    }
}

/// Per-outcome line counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStats {
    pub lines: u64,
    pub decode_failed: u64,
    pub duplicates: u64,
    pub no_match: u64,
    pub no_variables: u64,
    pub submitted: u64,
    pub submit_failed: u64,
}

impl LineStats {
    pub fn record(&mut self, outcome: LineOutcome) {
        self.lines += 1;
        let counter = match outcome {
            LineOutcome::DecodeFailed => &mut self.decode_failed,
            LineOutcome::Duplicate => &mut self.duplicates,
            LineOutcome::NoMatch => &mut self.no_match,
            LineOutcome::NoVariables => &mut self.no_variables,
            LineOutcome::Submitted => &mut self.submitted,
            LineOutcome::SubmitFailed => &mut self.submit_failed,
        };
        *counter += 1;
    }
}

/// Decode one raw line into a reading
pub fn decode_reading(line: &[u8]) -> Result<Reading, ContractError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| ContractError::decode(format!("invalid UTF-8: {}", e)))?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(reading)) => Ok(reading),
        Ok(other) => Err(ContractError::decode(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ContractError::decode(format!("invalid JSON: {}", e))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Drives lines from a source through matching into a sink
///
/// Owns the dedup slot, so one pipeline serves exactly one stream.
pub struct StreamPipeline<K> {
    engine: MatchEngine,
    dedup: Deduplicator,
    sink: K,
    stats: LineStats,
}

impl<K: RecordSink> StreamPipeline<K> {
    /// Create a new pipeline
    pub fn new(engine: MatchEngine, sink: K) -> Self {
        Self {
            engine,
            dedup: Deduplicator::new(),
            sink,
            stats: LineStats::default(),
        }
    }

    /// Process one line using the wall clock for timestamp fallback
    pub fn process_line(&mut self, line: &[u8]) -> LineOutcome {
        self.process_line_at(line, Utc::now())
    }

    /// Process one line with an explicit fallback time
    pub fn process_line_at(&mut self, line: &[u8], now: DateTime<Utc>) -> LineOutcome {
        let outcome = self.handle(line, now);
        self.stats.record(outcome);
        observability::record_line_outcome(outcome.as_str());
        outcome
    }

    fn handle(&mut self, line: &[u8], now: DateTime<Utc>) -> LineOutcome {
        info!(line = %String::from_utf8_lossy(line), "Received line");

        let reading = match decode_reading(line) {
            Ok(reading) => reading,
            Err(e) => {
                error!(error = %e, "Discarding undecodable line");
                return LineOutcome::DecodeFailed;
            }
        };

        if self.dedup.check(&reading) {
            return LineOutcome::Duplicate;
        }

        match self.engine.evaluate_at(&reading, now) {
            Evaluation::NoMatch => LineOutcome::NoMatch,
            Evaluation::NoVariables { .. } => LineOutcome::NoVariables,
            Evaluation::Record { sensor, record, .. } => match self.sink.submit(&record) {
                Ok(()) => {
                    observability::record_record_submitted(&sensor);
                    observability::record_queue_pending(self.sink.pending());
                    debug!(
                        sensor = %sensor,
                        instrument_id = %record.instrument_id,
                        measurements = record.measurement_count(),
                        "Record submitted"
                    );
                    LineOutcome::Submitted
                }
                Err(e) => {
                    error!(sensor = %sensor, sink = self.sink.name(), error = %e, "Submit failed");
                    LineOutcome::SubmitFailed
                }
            },
        }
    }

    /// Consume `source` until it ends
    ///
    /// Returns `Ok(())` at a normal end of input, and the source's error
    /// (typically `UpstreamClosed`) otherwise. Pipeline state survives, so the
    /// caller may run it again on a fresh source.
    #[instrument(name = "stream_pipeline_run", skip_all, fields(source = %source.name()))]
    pub async fn run<L: LineSource>(&mut self, source: &mut L) -> Result<(), ContractError> {
        while let Some(line) = source.next_line().await? {
            self.process_line(&line);
        }
        info!(lines = self.stats.lines, "Input ended");
        Ok(())
    }

    /// Forget the previous reading (used when the decoder restarts)
    pub fn reset_dedup(&mut self) {
        self.dedup.reset();
    }

    pub fn stats(&self) -> &LineStats {
        &self.stats
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockLineSource;
    use chrono::TimeZone;
    use contracts::{
        DecoderConfig, InstrumentId, SensorDefinition, StationConfig, TelemetryRecord,
        VariableMapping,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<TelemetryRecord>>,
        refuse: bool,
    }

    impl RecordSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn submit(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
            if self.refuse {
                return Err(ContractError::QueueFull {
                    sink_name: "recording".into(),
                    max: 0,
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn pending(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

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

    fn pipeline() -> StreamPipeline<Arc<RecordingSink>> {
        StreamPipeline::new(engine(), Arc::new(RecordingSink::default()))
    }

    const LINE: &[u8] =
        br#"{"model":"X","id":1,"temperature":21.5,"time":"2024-01-01 00:00:00"}"#;

    #[test]
    fn test_decode_reading_rejects_non_objects() {
        assert!(decode_reading(br#"{"a":1}"#).is_ok());
        let bad_lines: [&[u8]; 6] = [b"[1,2]", b"42", b"\"x\"", b"not json", b"", b"\xff{}"];
        for bad in bad_lines {
            assert!(
                matches!(decode_reading(bad), Err(ContractError::Decode { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_matching_line_is_submitted() {
        let mut p = pipeline();
        assert_eq!(p.process_line(LINE), LineOutcome::Submitted);

        let records = p.sink().records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 1_704_067_200);
        assert_eq!(records[0].variables.get("tempC"), Some(&json!(21.5)));
    }

    #[test]
    fn test_consecutive_duplicate_suppressed() {
        let mut p = pipeline();
        assert_eq!(p.process_line(LINE), LineOutcome::Submitted);
        assert_eq!(p.process_line(LINE), LineOutcome::Duplicate);
        assert_eq!(p.stats().submitted, 1);
        assert_eq!(p.stats().duplicates, 1);
    }

    #[test]
    fn test_key_order_does_not_defeat_dedup() {
        let mut p = pipeline();
        p.process_line(br#"{"model":"X","id":1,"temperature":20}"#);
        let outcome = p.process_line(br#"{"temperature":20,"id":1,"model":"X"}"#);
        assert_eq!(outcome, LineOutcome::Duplicate);
    }

    #[test]
    fn test_decode_failure_keeps_previous_reading() {
        let mut p = pipeline();
        p.process_line(LINE);
        assert_eq!(p.process_line(b"garbage"), LineOutcome::DecodeFailed);
        // previous reading is still LINE
        assert_eq!(p.process_line(LINE), LineOutcome::Duplicate);
    }

    #[test]
    fn test_non_matching_line_updates_dedup_slot() {
        let mut p = pipeline();
        p.process_line(LINE);
        assert_eq!(p.process_line(br#"{"model":"Y"}"#), LineOutcome::NoMatch);
        assert_eq!(p.process_line(LINE), LineOutcome::Submitted);
    }

    #[test]
    fn test_missing_fields_yield_no_record() {
        let mut p = pipeline();
        let outcome = p.process_line(br#"{"model":"X","id":1,"humidity":40}"#);
        assert_eq!(outcome, LineOutcome::NoVariables);
        assert!(p.sink().records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_time_uses_fallback_clock() {
        let mut p = pipeline();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let outcome = p.process_line_at(br#"{"model":"X","id":1,"temperature":5}"#, now);
        assert_eq!(outcome, LineOutcome::Submitted);
        assert_eq!(p.sink().records.lock().unwrap()[0].timestamp, now.timestamp());
    }

    #[test]
    fn test_sink_refusal_is_counted_not_fatal() {
        let sink = Arc::new(RecordingSink {
            refuse: true,
            ..Default::default()
        });
        let mut p = StreamPipeline::new(engine(), sink);
        assert_eq!(p.process_line(LINE), LineOutcome::SubmitFailed);
        assert_eq!(p.stats().submit_failed, 1);
    }

    #[test]
    fn test_reset_dedup() {
        let mut p = pipeline();
        p.process_line(LINE);
        p.reset_dedup();
        assert_eq!(p.process_line(LINE), LineOutcome::Submitted);
    }

    #[tokio::test]
    async fn test_run_until_end_of_input() {
        let mut p = pipeline();
        let mut source = MockLineSource::from_lines([LINE, LINE, &b"[]"[..]]);
        p.run(&mut source).await.unwrap();

        assert_eq!(p.stats().lines, 3);
        assert_eq!(p.stats().submitted, 1);
        assert_eq!(p.stats().duplicates, 1);
        assert_eq!(p.stats().decode_failed, 1);
    }

    #[tokio::test]
    async fn test_run_surfaces_upstream_failure() {
        let mut p = pipeline();
        let mut source = MockLineSource::from_lines([LINE]).with_upstream_failure("exit status: 1");
        let err = p.run(&mut source).await.unwrap_err();
        assert!(matches!(err, ContractError::UpstreamClosed { .. }));
        assert_eq!(p.stats().submitted, 1);
    }
}

//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 匹配 -> 记录 的跨 crate 行为
//! - 模拟 e2e 测试（无需 rtl_433 与网络）：MockLineSource -> StreamPipeline -> ChordsSink
//! - 投递队列重试与排空

/// 共享测试夹具
#[cfg(test)]
mod fixtures {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, StationConfig};
    use dispatcher::{Transport, Url};

    pub const STATION: &str = r#"{
        "chords_host": "chords.example.org",
        "api_email": "ops@example.org",
        "api_key": "s3cret",
        "instrument_id": 2,
        "max_queue_length": 100,
        "smart_sensors": [
            {
                "name": "yard",
                "enabled": true,
                "model": "X",
                "id": 1,
                "variables": [
                    {"rtl_name": "temperature", "chords_short_name": "tempC"}
                ]
            },
            {
                "name": "yard-fallback",
                "enabled": true,
                "model": "X",
                "variables": [
                    {"rtl_name": "humidity", "chords_short_name": "rh"}
                ]
            },
            {
                "name": "shed",
                "enabled": false,
                "model": "Y",
                "chords_inst_id": "9",
                "variables": [
                    {"rtl_name": "temperature", "chords_short_name": "shedT"}
                ]
            }
        ]
    }"#;

    pub fn station() -> Arc<StationConfig> {
        Arc::new(ConfigLoader::load_from_str(STATION, ConfigFormat::Json).unwrap())
    }

    /// Records every delivered URI; fails the first `failures` attempts
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        pub script: Arc<Mutex<VecDeque<bool>>>,
        pub delivered: Arc<Mutex<Vec<Url>>>,
        pub attempts: Arc<Mutex<u32>>,
    }

    impl ScriptedTransport {
        pub fn failing_first(failures: usize) -> Self {
            let transport = Self::default();
            transport
                .script
                .lock()
                .unwrap()
                .extend(std::iter::repeat(false).take(failures));
            transport
        }

        pub fn delivered(&self) -> Vec<Url> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn deliver(&self, uri: &Url) -> Result<(), ContractError> {
            *self.attempts.lock().unwrap() += 1;
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if !ok {
                return Err(ContractError::delivery("scripted", "connection refused"));
            }
            self.delivered.lock().unwrap().push(uri.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use super::fixtures::station;
    use serde_json::json;

    #[test]
    fn test_shorthand_criteria_loaded() {
        let config = station();
        let first = &config.smart_sensors[0];
        assert_eq!(first.match_criteria.get("model"), Some(&json!("X")));
        assert_eq!(first.match_criteria.get("id"), Some(&json!(1)));
        assert_eq!(config.instrument_for(first).unwrap().as_str(), "2");
        assert_eq!(
            config.instrument_for(&config.smart_sensors[2]).unwrap().as_str(),
            "9"
        );
    }

    #[test]
    fn test_catalogue_order_warnings() {
        assert!(config_loader::collect_warnings(&station()).is_empty());

        // A model-only sensor placed first swallows every reading of the
        // more specific one
        let mut swapped = (*station()).clone();
        swapped.smart_sensors.swap(0, 1);
        let warnings = config_loader::collect_warnings(&swapped);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("smart_sensors[1] 'yard' is shadowed by smart_sensors[0]"));
    }
}

#[cfg(test)]
mod matching_tests {
    use super::fixtures::station;
    use chrono::Utc;
    use contracts::Reading;
    use matcher::{find_match, Evaluation, MatchEngine, TimestampSource};
    use serde_json::{json, Value};

    fn reading(value: Value) -> Reading {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let config = station();
        // Matches both "yard" (model+id) and "yard-fallback" (model only)
        let r = reading(json!({"model": "X", "id": 1, "temperature": 3}));
        let found = find_match(&r, &config.smart_sensors).unwrap();
        assert_eq!(found.index, 0);
    }

    #[test]
    fn test_no_fallback_when_first_match_has_no_variables() {
        let engine = MatchEngine::new(station());
        // "yard" matches but has no temperature; "yard-fallback" would have rh
        let r = reading(json!({"model": "X", "id": 1, "humidity": 40}));
        assert_eq!(
            engine.evaluate(&r),
            Evaluation::NoVariables {
                sensor: "yard".to_string()
            }
        );
    }

    #[test]
    fn test_disabled_sensor_never_matches() {
        let config = station();
        let r = reading(json!({"model": "Y", "temperature": 10}));
        assert!(find_match(&r, &config.smart_sensors).is_none());
    }

    #[test]
    fn test_missing_time_uses_wall_clock() {
        let engine = MatchEngine::new(station());
        let r = reading(json!({"model": "X", "id": 1, "temperature": 21.5}));

        let before = Utc::now().timestamp();
        let Evaluation::Record {
            record,
            timestamp_source,
            ..
        } = engine.evaluate(&r)
        else {
            panic!("expected a record");
        };
        let after = Utc::now().timestamp();

        assert_eq!(timestamp_source, TimestampSource::Missing);
        assert!(record.timestamp >= before && record.timestamp <= after);
        assert_eq!(record.variables.get("at"), Some(&json!(record.timestamp)));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use dispatcher::{drain, ChordsSink, RecordSink, RetryPolicy};
    use ingestion::{open_replay_file, LineOutcome, MockLineSource, StreamPipeline};
    use matcher::MatchEngine;

    use super::fixtures::{station, ScriptedTransport};

    const REFERENCE: &str =
        r#"{"model":"X","id":1,"temperature":21.5,"time":"2024-01-01T00:00:00"}"#;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            max_attempts: None,
        }
    }

    /// Wait for the upload queue to empty; returns what is left
    async fn settle(sink: &ChordsSink) -> usize {
        drain(sink, Duration::from_millis(10), Some(Duration::from_secs(5))).await
    }

    fn chords_sink(transport: ScriptedTransport) -> Arc<ChordsSink> {
        Arc::new(ChordsSink::with_transport(&station(), transport, fast_retry()))
    }

    /// End-to-end test: MockLineSource -> StreamPipeline -> ChordsSink -> Transport
    #[tokio::test]
    async fn test_e2e_reference_reading() {
        let transport = ScriptedTransport::default();
        let sink = chords_sink(transport.clone());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), Arc::clone(&sink));

        let mut source = MockLineSource::from_lines([REFERENCE, REFERENCE]);
        pipeline.run(&mut source).await.unwrap();
        assert_eq!(pipeline.stats().submitted, 1);
        assert_eq!(pipeline.stats().duplicates, 1);

        assert_eq!(settle(&sink).await, 0);

        let delivered = transport.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(
            delivered[0].as_str(),
            "http://chords.example.org/measurements/url_create?instrument_id=2&tempC=21.5\
             &at=2024-01-01T00%3A00%3A00Z&email=ops%40example.org&api_key=s3cret"
        );
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_stream() {
        let transport = ScriptedTransport::default();
        let sink = chords_sink(transport.clone());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), Arc::clone(&sink));

        let mut source = MockLineSource::from_lines([
            &b"{\"model\":\"X\",\"id\":1,"[..],
            REFERENCE.as_bytes(),
        ]);
        pipeline.run(&mut source).await.unwrap();

        assert_eq!(pipeline.stats().decode_failed, 1);
        assert_eq!(pipeline.stats().submitted, 1);

        settle(&sink).await;
        assert_eq!(transport.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_one_changed_value_is_processed() {
        let sink = chords_sink(ScriptedTransport::default());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), sink);

        let changed = REFERENCE.replace("21.5", "21.6");
        assert_eq!(pipeline.process_line(REFERENCE.as_bytes()), LineOutcome::Submitted);
        assert_eq!(pipeline.process_line(changed.as_bytes()), LineOutcome::Submitted);
        assert_eq!(pipeline.process_line(changed.as_bytes()), LineOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_failed_uploads_are_retried_in_order() {
        let transport = ScriptedTransport::failing_first(3);
        let sink = chords_sink(transport.clone());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), Arc::clone(&sink));

        for t in ["1", "2", "3"] {
            let line = format!(r#"{{"model":"X","id":1,"temperature":{}}}"#, t);
            assert_eq!(pipeline.process_line(line.as_bytes()), LineOutcome::Submitted);
        }

        assert_eq!(settle(&sink).await, 0);

        let temps: Vec<String> = transport
            .delivered()
            .iter()
            .map(|uri| {
                uri.query_pairs()
                    .find(|(k, _)| k == "tempC")
                    .map(|(_, v)| v.into_owned())
                    .unwrap()
            })
            .collect();
        assert_eq!(temps, ["1", "2", "3"]);
        assert_eq!(*transport.attempts.lock().unwrap(), 6);
        assert_eq!(sink.metrics().failures(), 3);
    }

    #[tokio::test]
    async fn test_upstream_close_keeps_dedup_state() {
        let sink = chords_sink(ScriptedTransport::default());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), sink);

        let mut first =
            MockLineSource::from_lines([REFERENCE]).with_upstream_failure("exit status: 1");
        assert!(pipeline.run(&mut first).await.is_err());

        // Restarted decoder repeats the last reading
        let mut second = MockLineSource::from_lines([REFERENCE]);
        pipeline.run(&mut second).await.unwrap();
        assert_eq!(pipeline.stats().submitted, 1);
        assert_eq!(pipeline.stats().duplicates, 1);

        pipeline.reset_dedup();
        let mut third = MockLineSource::from_lines([REFERENCE]);
        pipeline.run(&mut third).await.unwrap();
        assert_eq!(pipeline.stats().submitted, 2);
    }

    #[tokio::test]
    async fn test_replay_file_end_to_end() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", REFERENCE).unwrap();
        writeln!(file, r#"{{"model":"Z","id":5}}"#).unwrap();
        writeln!(file, r#"{{"model":"Y","temperature":4}}"#).unwrap();
        writeln!(file, r#"{{"model":"X","id":1,"humidity":40}}"#).unwrap();

        let transport = ScriptedTransport::default();
        let sink = chords_sink(transport.clone());
        let mut pipeline = StreamPipeline::new(MatchEngine::new(station()), Arc::clone(&sink));

        let mut source = open_replay_file(file.path()).await.unwrap();
        pipeline.run(&mut source).await.unwrap();

        let stats = pipeline.stats();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.no_match, 2);
        assert_eq!(stats.no_variables, 1);

        settle(&sink).await;
        assert_eq!(transport.delivered().len(), 1);
        assert_eq!(sink.pending(), 0);
    }
}

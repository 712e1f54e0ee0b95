//! CHORDS `url_create` URI construction
//!
//! `http://{host}/measurements/url_create?instrument_id=..&{var}=..&at=..&email=..&api_key=..`

use chrono::DateTime;
use contracts::{TelemetryRecord, AT_VARIABLE};
use reqwest::Url;
use serde_json::Value;

use crate::error::DispatcherError;

const CREATE_PATH: &str = "measurements/url_create";
const AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Build the upload URI for one record
///
/// `host` may carry a scheme; `http://` is assumed otherwise. Query values
/// are percent-encoded. String variables are sent verbatim, anything else as
/// its JSON text.
pub fn build_record_uri(host: &str, record: &TelemetryRecord) -> Result<Url, DispatcherError> {
    let host = host.trim().trim_end_matches('/');
    let base = if host.contains("://") {
        format!("{}/{}", host, CREATE_PATH)
    } else {
        format!("http://{}/{}", host, CREATE_PATH)
    };
    let mut url =
        Url::parse(&base).map_err(|e| DispatcherError::invalid_uri(host, e.to_string()))?;

    let at = DateTime::from_timestamp(record.timestamp, 0)
        .ok_or_else(|| {
            let message = format!("timestamp {} out of range", record.timestamp);
            DispatcherError::invalid_uri(host, message)
        })?
        .format(AT_FORMAT)
        .to_string();

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("instrument_id", record.instrument_id.as_str());
        for (name, value) in &record.variables {
            if name == AT_VARIABLE {
                continue;
            }
            query.append_pair(name, &query_value(value));
        }
        query.append_pair(AT_VARIABLE, &at);
        query.append_pair("email", &record.credentials.api_email);
        query.append_pair("api_key", &record.credentials.api_key);
    }

    Ok(url)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// URI text with the `api_key` value masked, for logs
pub fn redact_uri(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Credentials, InstrumentId};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn record(variables: Vec<(&str, Value)>) -> TelemetryRecord {
        let mut vars: BTreeMap<String, Value> =
            variables.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        vars.insert(AT_VARIABLE.to_string(), json!(1_704_067_200));
        TelemetryRecord {
            instrument_id: InstrumentId::from(2u64),
            credentials: Credentials {
                api_email: "ops@example.org".into(),
                api_key: "s3cret".into(),
            },
            timestamp: 1_704_067_200,
            variables: vars,
        }
    }

    #[test]
    fn test_reference_uri() {
        let url = build_record_uri("chords.example.org", &record(vec![("tempC", json!(21.5))]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://chords.example.org/measurements/url_create?instrument_id=2&tempC=21.5\
             &at=2024-01-01T00%3A00%3A00Z&email=ops%40example.org&api_key=s3cret"
        );
    }

    #[test]
    fn test_host_with_scheme_and_trailing_slash() {
        let url = build_record_uri("https://chords.example.org/", &record(vec![])).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/measurements/url_create");
    }

    #[test]
    fn test_value_rendering() {
        let url = build_record_uri(
            "h",
            &record(vec![("batt", json!(true)), ("label", json!("a b&c")), ("n", json!(7))]),
        )
        .unwrap();
        let pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["batt"], "true");
        assert_eq!(pairs["label"], "a b&c");
        assert_eq!(pairs["n"], "7");
        assert_eq!(pairs["at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_invalid_host() {
        let result = build_record_uri("exa mple.org", &record(vec![]));
        assert!(matches!(result, Err(DispatcherError::InvalidUri { .. })));
    }

    #[test]
    fn test_redact_uri() {
        let url = build_record_uri("h", &record(vec![("t", json!(1))])).unwrap();
        let text = redact_uri(&url);
        assert!(!text.contains("s3cret"));
        assert!(text.contains("api_key=***") || text.contains("api_key=%2A%2A%2A"));
    }
}

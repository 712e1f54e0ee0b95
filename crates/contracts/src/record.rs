//! Reading / TelemetryRecord
//!
//! A `Reading` is one decoded JSON object from the decoder. A
//! `TelemetryRecord` is what leaves the process for the collection endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::InstrumentId;

/// One decoded decoder line
pub type Reading = Map<String, Value>;

/// Name of the synthetic timestamp variable carried by every record
pub const AT_VARIABLE: &str = "at";

/// Endpoint credentials copied from the station configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_email: String,
    pub api_key: String,
}

/// Outbound measurement addressed to one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Instrument the variables are attributed to
    pub instrument_id: InstrumentId,

    /// Upload credentials
    pub credentials: Credentials,

    /// Epoch seconds
    pub timestamp: i64,

    /// Short name -> value, always including `at`
    pub variables: BTreeMap<String, Value>,
}

impl TelemetryRecord {
    /// Number of extracted variables, excluding the synthetic `at`
    pub fn measurement_count(&self) -> usize {
        self.variables
            .keys()
            .filter(|name| name.as_str() != AT_VARIABLE)
            .count()
    }
}

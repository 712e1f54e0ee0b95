//! StationConfig - Config Loader output
//!
//! Describes the CHORDS endpoint, the radio decoder, and the ordered catalogue
//! of smart sensors whose readings are forwarded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use validator::Validate;

use crate::InstrumentId;

/// Field name -> required literal value
pub type MatchCriteria = BTreeMap<String, Value>;

/// Upper bound for `max_queue_length`
pub const MAX_QUEUE_LENGTH: usize = 1 << 24;

/// Type-sensitive literal equality used for match criteria
///
/// A string never equals a number. Integers and floats compare by value so
/// that a configured `12` matches a decoded `12.0`.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => {
            matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
        }
        _ => expected == actual,
    }
}

/// Complete station configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationConfig {
    /// CHORDS portal host, e.g. "chords.example.org" or "https://chords.example.org"
    #[validate(length(min = 1, message = "chords_host cannot be empty"))]
    pub chords_host: String,

    /// Account email used to authorize measurement uploads
    pub api_email: String,

    /// API key paired with `api_email`
    pub api_key: String,

    /// Default instrument for sensors without `chords_inst_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<InstrumentId>,

    /// Maximum number of records waiting for delivery
    #[serde(default = "default_max_queue_length")]
    #[validate(range(
        min = 1,
        max = MAX_QUEUE_LENGTH,
        message = "max_queue_length must be between 1 and 16777216"
    ))]
    pub max_queue_length: usize,

    /// Radio decoder process settings
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Ordered sensor catalogue, first match wins
    #[validate(length(min = 1, message = "at least one smart sensor must be defined"))]
    #[validate(nested)]
    pub smart_sensors: Vec<SensorDefinition>,
}

fn default_max_queue_length() -> usize {
    10 * 60 * 24
}

impl StationConfig {
    /// Instrument identity for a sensor: its own override, else the global default
    pub fn instrument_for<'a>(&'a self, sensor: &'a SensorDefinition) -> Option<&'a InstrumentId> {
        sensor.instrument_id.as_ref().or(self.instrument_id.as_ref())
    }

    /// Sensors that take part in matching
    pub fn enabled_sensors(&self) -> impl Iterator<Item = &SensorDefinition> {
        self.smart_sensors.iter().filter(|s| s.enabled)
    }
}

/// Radio decoder (rtl_433) process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Executable path
    #[serde(default = "default_decoder_path")]
    pub path: String,

    /// Receive frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency: u64,

    /// Additional arguments appended after the defaults
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Pause before restarting a decoder that exited
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

fn default_decoder_path() -> String {
    "/usr/local/bin/rtl_433".to_string()
}

fn default_frequency() -> u64 {
    915_000_000
}

fn default_restart_delay() -> u64 {
    1
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            path: default_decoder_path(),
            frequency: default_frequency(),
            extra_args: Vec::new(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl DecoderConfig {
    /// Arguments that make the decoder print one JSON object per line
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.frequency.to_string(),
            "-F".to_string(),
            "json".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// One configured sensor
///
/// Deserialized through [`SensorDefinitionRepr`] so that the `model` / `id`
/// shorthand and the general `matches` table end up in one criteria map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(try_from = "SensorDefinitionRepr", into = "SensorDefinitionRepr")]
pub struct SensorDefinition {
    /// Optional label used in logs
    pub name: Option<String>,

    /// Disabled sensors are never matched
    pub enabled: bool,

    /// Every key must be present in a reading with an equal value
    #[validate(length(min = 1, message = "match criteria cannot be empty"))]
    pub match_criteria: MatchCriteria,

    /// Per-sensor instrument override
    pub instrument_id: Option<InstrumentId>,

    /// Variables to extract, in order
    #[validate(nested)]
    pub variables: Vec<VariableMapping>,
}

impl SensorDefinition {
    /// Human readable label: the configured name, or the criteria
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let mut out = String::new();
        for (idx, (key, value)) in self.match_criteria.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            let _ = match value {
                Value::String(s) => write!(out, "{key}={s}"),
                other => write!(out, "{key}={other}"),
            };
        }
        out
    }
}

/// On-disk shape of a sensor entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDefinitionRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub enabled: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub matches: MatchCriteria,

    /// Shorthand for `matches.model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,

    /// Shorthand for `matches.id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chords_inst_id: Option<InstrumentId>,

    pub variables: Vec<VariableMapping>,
}

impl TryFrom<SensorDefinitionRepr> for SensorDefinition {
    type Error = String;

    fn try_from(repr: SensorDefinitionRepr) -> Result<Self, Self::Error> {
        let mut match_criteria = repr.matches;
        for (key, shorthand) in [("model", repr.model), ("id", repr.id)] {
            let Some(value) = shorthand else { continue };
            match match_criteria.get(key) {
                Some(existing) if !values_equal(existing, &value) => {
                    return Err(format!(
                        "'{key}' is given both as shorthand ({value}) and in matches ({existing})"
                    ));
                }
                _ => {
                    match_criteria.insert(key.to_string(), value);
                }
            }
        }
        Ok(Self {
            name: repr.name,
            enabled: repr.enabled,
            match_criteria,
            instrument_id: repr.chords_inst_id,
            variables: repr.variables,
        })
    }
}

impl From<SensorDefinition> for SensorDefinitionRepr {
    fn from(def: SensorDefinition) -> Self {
        Self {
            name: def.name,
            enabled: def.enabled,
            matches: def.match_criteria,
            model: None,
            id: None,
            chords_inst_id: def.instrument_id,
            variables: def.variables,
        }
    }
}

/// Source field -> CHORDS short name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VariableMapping {
    /// Key read from the decoded reading
    #[serde(rename = "rtl_name")]
    #[validate(length(min = 1, message = "rtl_name cannot be empty"))]
    pub source_field: String,

    /// Short name used in the outbound record
    #[serde(rename = "chords_short_name")]
    #[validate(length(min = 1, message = "chords_short_name cannot be empty"))]
    pub destination_name: String,
}

impl VariableMapping {
    pub fn new(source_field: impl Into<String>, destination_name: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            destination_name: destination_name.into(),
        }
    }
}

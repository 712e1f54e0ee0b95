//! Ordered first-match sensor lookup and variable extraction.

use std::collections::BTreeMap;

use contracts::{values_equal, Reading, SensorDefinition};
use serde_json::Value;
use tracing::{debug, info, warn};

/// A reading matched against one catalogue entry
#[derive(Debug, Clone)]
pub struct SensorMatch<'a> {
    /// Position in the catalogue
    pub index: usize,
    /// The matched definition
    pub sensor: &'a SensorDefinition,
    /// destination name -> value, for every source field present
    pub variables: BTreeMap<String, Value>,
    /// Source fields declared by the sensor but absent from the reading
    pub missing_fields: Vec<&'a str>,
}

impl SensorMatch<'_> {
    pub fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }
}

/// Find the first enabled sensor whose criteria are all satisfied
///
/// Scanning stops at that sensor even if it yields no variables.
pub fn find_match<'a>(
    reading: &Reading,
    catalogue: &'a [SensorDefinition],
) -> Option<SensorMatch<'a>> {
    for (index, sensor) in catalogue.iter().enumerate() {
        if !sensor.enabled {
            continue;
        }
        if !criteria_satisfied(sensor, reading) {
            debug!(sensor = %sensor.label(), "Sensor criteria do not match reading");
            continue;
        }

        info!(sensor = %sensor.label(), index, "Found matching sensor");
        let (variables, missing_fields) = extract_variables(sensor, reading);
        return Some(SensorMatch {
            index,
            sensor,
            variables,
            missing_fields,
        });
    }
    None
}

/// Every criteria key present in the reading with an equal value
pub fn criteria_satisfied(sensor: &SensorDefinition, reading: &Reading) -> bool {
    sensor
        .match_criteria
        .iter()
        .all(|(key, expected)| {
            reading
                .get(key)
                .is_some_and(|actual| values_equal(expected, actual))
        })
}

fn extract_variables<'a>(
    sensor: &'a SensorDefinition,
    reading: &Reading,
) -> (BTreeMap<String, Value>, Vec<&'a str>) {
    let mut variables = BTreeMap::new();
    let mut missing = Vec::new();

    for mapping in &sensor.variables {
        match reading.get(&mapping.source_field) {
            Some(value) => {
                debug!(
                    field = %mapping.source_field,
                    short_name = %mapping.destination_name,
                    value = %value,
                    "Found matching data"
                );
                variables.insert(mapping.destination_name.clone(), value.clone());
            }
            None => {
                warn!(
                    sensor = %sensor.label(),
                    field = %mapping.source_field,
                    "Field does not exist in reading"
                );
                missing.push(mapping.source_field.as_str());
            }
        }
    }

    (variables, missing)
}

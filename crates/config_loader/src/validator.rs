//! 配置校验模块
//!
//! 校验规则：
//! - smart_sensors 非空
//! - 每个 sensor 的匹配条件非空，变量名非空
//! - 1 <= max_queue_length <= MAX_QUEUE_LENGTH
//! - 变量名不能使用保留的 `at`
//! - 每个启用的 sensor 都能解析出 instrument id
//!
//! 非致命问题 (空变量列表、被遮蔽的 sensor 等) 通过 `collect_warnings` 返回。

use std::collections::HashSet;

use contracts::{values_equal, ContractError, SensorDefinition, StationConfig, AT_VARIABLE};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 StationConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &StationConfig) -> Result<(), ContractError> {
    validate_shape(config)?;
    validate_destination_names(config)?;
    validate_instruments(config)?;
    Ok(())
}

/// 结构校验 (derive 规则)
fn validate_shape(config: &StationConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 取出第一个字段错误 (按字段名排序，保证结果稳定)
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// `at` 是时间戳字段，不能作为变量名
fn validate_destination_names(config: &StationConfig) -> Result<(), ContractError> {
    for (idx, sensor) in config.smart_sensors.iter().enumerate() {
        for (var_idx, var) in sensor.variables.iter().enumerate() {
            if var.destination_name == AT_VARIABLE {
                return Err(ContractError::config_validation(
                    format!("smart_sensors[{idx}].variables[{var_idx}].destination_name"),
                    format!(
                        "'{AT_VARIABLE}' is reserved for the timestamp (rtl_name '{}')",
                        var.source_field
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// 校验每个启用的 sensor 都有 instrument id
fn validate_instruments(config: &StationConfig) -> Result<(), ContractError> {
    for (idx, sensor) in config.smart_sensors.iter().enumerate() {
        if sensor.enabled && config.instrument_for(sensor).is_none() {
            return Err(ContractError::config_validation(
                format!("smart_sensors[{idx}].chords_inst_id"),
                format!(
                    "sensor '{}' has no chords_inst_id and no global instrument_id is set",
                    sensor.label()
                ),
            ));
        }
    }
    Ok(())
}

/// 收集非致命配置问题
pub fn collect_warnings(config: &StationConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.enabled_sensors().next().is_none() {
        warnings.push("all smart sensors are disabled - no data will be forwarded".to_string());
    }

    if config.api_email.is_empty() || config.api_key.is_empty() {
        warnings.push("api_email or api_key is empty - uploads may be rejected".to_string());
    }

    for (idx, sensor) in config.smart_sensors.iter().enumerate() {
        if sensor.variables.is_empty() {
            warnings.push(format!(
                "smart_sensors[{idx}] '{}' has no variables - matching readings are never sent",
                sensor.label()
            ));
        }

        let mut seen = HashSet::new();
        for var in &sensor.variables {
            if !seen.insert(var.destination_name.as_str()) {
                warnings.push(format!(
                    "smart_sensors[{idx}] '{}' maps more than one field to '{}'",
                    sensor.label(),
                    var.destination_name
                ));
            }
        }

        if let Some(earlier) = shadowed_by(config, idx) {
            warnings.push(format!(
                "smart_sensors[{idx}] '{}' is shadowed by smart_sensors[{earlier}] and will never match",
                sensor.label()
            ));
        }
    }

    warnings
}

/// 前面启用的 sensor 条件是当前 sensor 条件的子集时，当前 sensor 永远不会被匹配
fn shadowed_by(config: &StationConfig, idx: usize) -> Option<usize> {
    let sensor = &config.smart_sensors[idx];
    if !sensor.enabled {
        return None;
    }
    config.smart_sensors[..idx]
        .iter()
        .position(|earlier| earlier.enabled && criteria_subset(earlier, sensor))
}

fn criteria_subset(general: &SensorDefinition, specific: &SensorDefinition) -> bool {
    general
        .match_criteria
        .iter()
        .all(|(key, value)| {
            specific
                .match_criteria
                .get(key)
                .is_some_and(|other| values_equal(value, other))
        })
}

//! `--validate` implementation.

use anyhow::{Context, Result};
use contracts::StationConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::Cli;
use crate::error::load_config;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    chords_host: String,
    instrument_id: Option<String>,
    max_queue_length: usize,
    decoder: String,
    sensor_count: usize,
    enabled_sensor_count: usize,
    variable_count: usize,
}

impl From<&StationConfig> for ConfigSummary {
    fn from(config: &StationConfig) -> Self {
        Self {
            chords_host: config.chords_host.clone(),
            instrument_id: config.instrument_id.as_ref().map(|id| id.to_string()),
            max_queue_length: config.max_queue_length,
            decoder: format!(
                "{} {}",
                config.decoder.path,
                config.decoder.command_args().join(" ")
            ),
            sensor_count: config.smart_sensors.len(),
            enabled_sensor_count: config.enabled_sensors().count(),
            variable_count: config
                .enabled_sensors()
                .map(|sensor| sensor.variables.len())
                .sum(),
        }
    }
}

/// Execute `--validate`
pub fn run_validate(cli: &Cli) -> Result<()> {
    info!(config = %cli.config.display(), "Validating configuration");

    let result = validate_config(cli);

    if cli.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(cli: &Cli) -> ValidationResult {
    let config_path = cli.config.display().to_string();

    match load_config(&cli.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: config_loader::collect_warnings(&config),
            summary: Some(ConfigSummary::from(&config)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  CHORDS host: {}", summary.chords_host);
            println!(
                "  Default instrument: {}",
                summary.instrument_id.as_deref().unwrap_or("-")
            );
            println!("  Max queue length: {}", summary.max_queue_length);
            println!("  Decoder: {}", summary.decoder);
            println!(
                "  Sensors: {} ({} enabled)",
                summary.sensor_count, summary.enabled_sensor_count
            );
            println!("  Variables: {}", summary.variable_count);
        }

        if !result.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

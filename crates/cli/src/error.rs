//! Error types for CLI operations.

use std::path::Path;

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration {path}: {source}")]
    ConfigInvalid {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Output sink could not be created
    #[error("Failed to set up delivery to {host}: {message}")]
    SinkSetup { host: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config_invalid(path: &Path, source: ContractError) -> Self {
        Self::ConfigInvalid {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn sink_setup(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkSetup {
            host: host.into(),
            message: message.into(),
        }
    }
}

/// Load and validate the station configuration
pub fn load_config(path: &Path) -> Result<contracts::StationConfig, CliError> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    config_loader::ConfigLoader::load_from_path(path).map_err(|e| CliError::config_invalid(path, e))
}

//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Host or record cannot be turned into a URI
    #[error("cannot build URI for host '{host}': {message}")]
    InvalidUri { host: String, message: String },

    /// Contract-level error
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid URI error
    pub fn invalid_uri(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUri {
            host: host.into(),
            message: message.into(),
        }
    }
}

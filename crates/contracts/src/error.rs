//! Layered error definitions
//!
//! Categorized by source: config / decode / upstream / delivery

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// A single input line could not be decoded into a reading
    #[error("decode error: {message}")]
    Decode { message: String },

    /// The line source ended or failed unexpectedly
    #[error("upstream '{source_name}' closed: {message}")]
    UpstreamClosed {
        source_name: String,
        message: String,
    },

    // ===== Delivery Errors =====
    /// Transmission to the collection endpoint failed
    #[error("delivery via '{sink_name}' failed: {message}")]
    Delivery { sink_name: String, message: String },

    /// Delivery queue is at its maximum depth
    #[error("queue full for sink '{sink_name}': max={max}")]
    QueueFull { sink_name: String, max: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create upstream closed error
    pub fn upstream_closed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamClosed {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

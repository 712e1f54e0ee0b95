//! Transport trait - one delivery attempt of one URI
//!
//! The queue worker owns retry; a transport only reports success or failure.

use std::time::Duration;

use contracts::ContractError;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::error::DispatcherError;

/// Delivers an upload URI to the collection endpoint
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Make one delivery attempt
    ///
    /// # Errors
    /// `Delivery` on connection failure or a non-success status
    async fn deliver(&self, uri: &Url) -> Result<(), ContractError>;
}

/// HTTP GET transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, DispatcherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatcherError::sink_creation("http", e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_transport_deliver", skip_all, fields(host = ?uri.host_str()))]
    async fn deliver(&self, uri: &Url) -> Result<(), ContractError> {
        let response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(|e| ContractError::delivery("http", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::delivery(
                "http",
                format!("server responded {}", status),
            ));
        }
        debug!(status = status.as_u16(), "Delivered");
        Ok(())
    }
}

//! HTTP transport seam
//!
//! Every endpoint the client talks to (schedule, reverse geocoding, save) is
//! reached through the [`Transport`] trait, so tests can swap the network for
//! canned responses.

use async_trait::async_trait;

use crate::core::error::Result;

#[cfg(test)]
use mockall::automock;

/// Status and body of a completed GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// A `200 OK` response
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// A response with an arbitrary status
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests with query parameters
///
/// Implementations report transport failures (connection, timeout) as
/// `MawaqitError::Network` and return every completed exchange, whatever its
/// status, as an [`HttpResponse`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse>;
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{HttpResponse, Transport};
    use crate::core::config::ClientConfig;
    use crate::core::error::{MawaqitError, Result};

    /// reqwest-backed transport
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        /// Build a client with the configured timeout and user agent
        pub fn new(config: &ClientConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| MawaqitError::invalid_config(format!("HTTP client: {}", e)))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
            tracing::debug!(url, ?query, "GET");
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| MawaqitError::network(format!("GET {}: {}", url, e)))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| MawaqitError::network(format!("reading body of {}: {}", url, e)))?;

            Ok(HttpResponse { status, body })
        }
    }
}

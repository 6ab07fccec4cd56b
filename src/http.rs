//! Transport session construction and HTTP logging utilities.

use reqwest::RequestBuilder;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Build the shared, connection-pooled HTTP session.
///
/// The pool is sized to the concurrency bound so every admitted call can hold
/// a warm connection, idle connections are kept alive for `keep_alive`, and
/// the connect timeout is narrower than the read timeout. No whole-request
/// timeout is set here: attempt budgets are enforced by the executor and
/// streams are bounded by the caller's deadline.
pub fn build_transport(config: &ClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(config.max_concurrent)
        .pool_idle_timeout(config.keep_alive)
        .tcp_keepalive(config.keep_alive)
        .tcp_nodelay(true)
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.timeout)
        .build()
}

/// Extension trait for RequestBuilder that logs request body.
pub trait RequestBuilderExt {
    /// Set JSON request body and log it. Returns the RequestBuilder for chaining.
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self;
}

impl RequestBuilderExt for RequestBuilder {
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        if let Ok(req_body) = serde_json::to_string(json) {
            tracing::debug!("request body ({} bytes): {}", req_body.len(), req_body);
        }

        self.json(json)
    }
}

/// Extension trait for Response that logs response body.
#[async_trait::async_trait]
pub trait ResponseExt {
    /// Parse response as JSON and log it. Consumes the response.
    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, ClientError>;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;

        if let Ok(text) = std::str::from_utf8(&bytes) {
            tracing::debug!("response body ({} bytes): {}", text.len(), text);
        }

        serde_json::from_slice(&bytes).map_err(ClientError::from)
    }
}

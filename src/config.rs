//! Client configuration.

use std::time::Duration;

/// Configuration for a [`Client`](crate::Client).
///
/// Created once at client construction and never mutated afterwards; every
/// request issued through one client shares the same configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat-completion backend.
    pub base_url: String,

    /// Model identifier sent in every request body.
    pub model: String,

    /// `max_tokens` sent in every request body.
    pub max_tokens: u32,

    /// Overall default timeout; also the transport read timeout.
    pub timeout: Duration,

    /// TCP connect timeout, narrower than the read timeout.
    pub connect_timeout: Duration,

    /// Maximum number of concurrently in-flight logical calls.
    /// Also sizes the connection pool.
    pub max_concurrent: usize,

    /// Keep-alive duration for pooled connections.
    pub keep_alive: Duration,

    /// Maximum attempts per logical call (first try included).
    pub retry_attempts: u32,

    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,

    /// Upper bound on any single backoff delay.
    pub max_retry_delay: Duration,

    /// Maximum number of buffers retained by the streaming buffer pool.
    pub max_pooled_buffers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            model: "test-model".to_string(),
            max_tokens: 100,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            max_concurrent: 32,
            keep_alive: Duration::from_secs(60),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
            max_pooled_buffers: 10,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at the given base URL, defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the in-flight call bound.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the retry attempt limit.
    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    /// Set the backoff base and cap.
    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.max_retry_delay = max;
        self
    }
}

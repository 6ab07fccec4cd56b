//! Error taxonomy for client operations.
//!
//! Every failure carries an explicit classification assigned at the point the
//! HTTP status (or transport outcome) is first observed. The retry loop
//! branches on variants, never on message text.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The deadline passed before the call could complete. No new I/O is
    /// started once this is observed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The call was canceled before it could run (client shutting down).
    #[error("call canceled")]
    Canceled,

    /// HTTP 429. `retry_after` is the server-specified wait in seconds
    /// (1.0 when the header is absent or unparseable).
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64 },

    /// HTTP 5xx.
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    /// Non-retriable 4xx other than 429.
    #[error("bad request: HTTP {status}")]
    BadRequest { status: u16 },

    /// A single attempt exceeded its time budget.
    #[error("request timed out")]
    Timeout,

    /// The deadline expired while reading a streamed response body.
    #[error("stream timed out")]
    StreamTimeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] reqwest::Error),

    /// Any other transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON of the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The caller violated a precondition; never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// All retry attempts were consumed. Wraps the last observed error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },

    /// Catch-all for failures outside the taxonomy.
    #[error("unexpected failure after {elapsed:?}: {message}")]
    Unexpected { message: String, elapsed: Duration },
}

impl ClientError {
    /// Whether the retry loop may try again after backing off.
    ///
    /// Rate limiting is transient too, but it is handled separately because
    /// the server-specified delay takes precedence over the backoff formula.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Server { .. } | ClientError::Timeout | ClientError::ConnectionFailed(_)
        )
    }
}

//! Deadline-aware request executor.
//!
//! [`Client`] orchestrates one logical chat-completion call end to end:
//! admission through a counting semaphore, a single idempotency key for all
//! attempts, a retry loop that never outlives the caller's deadline, and a
//! pull-based streaming reader backed by the buffer pool.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::debug;
use uuid::Uuid;

use crate::backoff::{backoff_delay, retry_after_seconds};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{build_transport, RequestBuilderExt, ResponseExt};
use crate::model::{ChatCompletion, ChatRequest, Message};
use crate::pool::BufferPool;
use crate::sse::{is_done_marker, SseDecoder};
use crate::stats::{ClientStats, StatsSnapshot};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
const CLIENT_TAG: &str = "rs";

/// Stream of decoded chat-completion events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value, ClientError>> + Send>>;

/// Connection-pooled, deadline-aware chat-completion client.
///
/// One instance owns its transport session, buffer pool and admission
/// semaphore; independently configured clients can coexist in one process.
/// All methods take `&self` and are safe to call from many tasks at once.
pub struct Client {
    config: ClientConfig,
    semaphore: Arc<Semaphore>,
    pool: Arc<BufferPool>,
    transport: OnceCell<reqwest::Client>,
    stats: Arc<ClientStats>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            pool: Arc::new(BufferPool::new(config.max_pooled_buffers)),
            transport: OnceCell::new(),
            stats: Arc::new(ClientStats::default()),
            config,
        }
    }

    /// Issue a chat completion and return the parsed response body.
    ///
    /// `deadline` is absolute: admission waits, every retry and the response
    /// read all share it. A deadline already in the past fails with
    /// [`ClientError::DeadlineExceeded`] before any network I/O.
    pub async fn chat_completion(
        &self,
        messages: Vec<Message>,
        deadline: Instant,
    ) -> Result<ChatCompletion, ClientError> {
        let _permit = self.admit(&messages, deadline).await.map_err(|e| self.fail(e))?;

        let start = Instant::now();
        let budget = deadline.saturating_duration_since(start);
        let key = idempotency_key();
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            max_tokens: self.config.max_tokens,
            stream: None,
        };

        let response = self
            .execute_with_retries(&request, budget, &key, start)
            .await
            .map_err(|e| self.fail(e))?;

        // The attempt ceiling only covers the response head; the body read
        // gets whatever is left of the caller's budget.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let completion = match timeout(remaining, response.json_logged::<ChatCompletion>()).await {
            Ok(parsed) => parsed.map_err(|e| self.fail(e))?,
            Err(_) => return Err(self.fail(ClientError::DeadlineExceeded)),
        };

        self.stats.record_success();
        Ok(completion)
    }

    /// Issue a streaming chat completion.
    ///
    /// The returned stream is lazy and pull-based: no chunk is read from the
    /// network until the caller asks for the next event. The concurrency
    /// permit is held until the stream terminates or fails, so an active
    /// stream counts against `max_concurrent` for its whole lifetime.
    /// Malformed frames are dropped; mid-stream failures are never retried.
    pub async fn stream_chat_completion(
        &self,
        messages: Vec<Message>,
        deadline: Instant,
    ) -> Result<EventStream, ClientError> {
        let permit = self.admit(&messages, deadline).await.map_err(|e| self.fail(e))?;

        let start = Instant::now();
        let budget = deadline.saturating_duration_since(start);
        let key = idempotency_key();
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            max_tokens: self.config.max_tokens,
            stream: Some(true),
        };

        let response = self
            .execute_with_retries(&request, budget, &key, start)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Box::pin(event_stream(
            response,
            Arc::clone(&self.pool),
            Arc::clone(&self.stats),
            deadline,
            permit,
        )))
    }

    /// Read-only snapshot of this client's usage counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Admission control: validate the call, take a permit (may suspend until
    /// a slot frees), then re-check the deadline before any I/O starts.
    async fn admit(
        &self,
        messages: &[Message],
        deadline: Instant,
    ) -> Result<OwnedSemaphorePermit, ClientError> {
        if messages.is_empty() {
            return Err(ClientError::InvalidRequest("messages must not be empty"));
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ClientError::Canceled)?;

        if Instant::now() > deadline {
            return Err(ClientError::DeadlineExceeded);
        }
        Ok(permit)
    }

    /// Retry loop for one logical call.
    ///
    /// Deadline checks happen before issuing I/O and before sleeping; an
    /// attempt already in flight is allowed to finish. 429 sleeps exactly the
    /// server-specified delay, transient failures use exponential backoff,
    /// everything else fails immediately.
    async fn execute_with_retries(
        &self,
        request: &ChatRequest<'_>,
        budget: Duration,
        key: &str,
        start: Instant,
    ) -> Result<reqwest::Response, ClientError> {
        let mut attempt = 0;
        let mut last_error: Option<ClientError> = None;

        while attempt < self.config.retry_attempts {
            attempt += 1;

            let elapsed = start.elapsed();
            if elapsed >= budget {
                return Err(ClientError::DeadlineExceeded);
            }
            let attempt_timeout = budget - elapsed;

            match self.send_attempt(request, attempt_timeout, key, start).await {
                Ok(response) => return Ok(response),
                Err(ClientError::RateLimited { retry_after }) => {
                    let wait = Duration::from_secs_f64(retry_after);
                    if elapsed + wait >= budget {
                        return Err(ClientError::DeadlineExceeded);
                    }
                    debug!(attempt, retry_after, "rate limited, honoring Retry-After");
                    sleep(wait).await;
                    self.stats.record_retry();
                    last_error = Some(ClientError::RateLimited { retry_after });
                }
                Err(err) if err.is_transient() => {
                    let delay = backoff_delay(
                        attempt,
                        self.config.retry_base_delay,
                        self.config.max_retry_delay,
                    );
                    if elapsed + delay >= budget {
                        return Err(ClientError::DeadlineExceeded);
                    }
                    debug!(attempt, ?delay, error = %err, "transient failure, backing off");
                    sleep(delay).await;
                    self.stats.record_retry();
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(match last_error {
            Some(last) => ClientError::MaxRetriesExceeded {
                attempts: attempt,
                last: Box::new(last),
            },
            None => ClientError::Unexpected {
                message: "retry loop made no attempts".to_string(),
                elapsed: start.elapsed(),
            },
        })
    }

    /// One HTTP attempt under its own hard time ceiling.
    async fn send_attempt(
        &self,
        request: &ChatRequest<'_>,
        attempt_timeout: Duration,
        key: &str,
        call_start: Instant,
    ) -> Result<reqwest::Response, ClientError> {
        let session = self.session().await?;
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        self.stats.record_attempt();
        let sent = timeout(
            attempt_timeout,
            session
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header(IDEMPOTENCY_KEY_HEADER, key)
                .json_logged(request)
                .send(),
        )
        .await;

        let response = match sent {
            Err(_) => return Err(ClientError::Timeout),
            Ok(Err(err)) if err.is_connect() => return Err(ClientError::ConnectionFailed(err)),
            Ok(Err(err)) if err.is_timeout() => return Err(ClientError::Timeout),
            Ok(Err(err)) => return Err(ClientError::Http(err)),
            Ok(Ok(response)) => response,
        };

        classify_response(response, call_start)
    }

    /// Lazily build the shared transport session on first use.
    async fn session(&self) -> Result<&reqwest::Client, ClientError> {
        self.transport
            .get_or_try_init(|| async { build_transport(&self.config) })
            .await
            .map_err(ClientError::Http)
    }

    fn fail(&self, err: ClientError) -> ClientError {
        self.stats.record_failure();
        err
    }
}

/// Map an HTTP status to the error taxonomy at the point it is observed.
fn classify_response(
    response: reqwest::Response,
    call_start: Instant,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(ClientError::RateLimited {
            retry_after: retry_after_seconds(response.headers()),
        })
    } else if status.is_server_error() {
        Err(ClientError::Server {
            status: status.as_u16(),
        })
    } else if status.is_client_error() {
        Err(ClientError::BadRequest {
            status: status.as_u16(),
        })
    } else {
        Err(ClientError::Unexpected {
            message: format!("unexpected HTTP status {status}"),
            elapsed: call_start.elapsed(),
        })
    }
}

/// Lazy SSE event stream over one response body.
///
/// Holds the concurrency permit until it terminates. The accumulation buffer
/// goes back to the pool on every exit path, and the call's terminal outcome
/// is counted where the stream actually ends: success at `[DONE]` or EOF,
/// failure on a timeout or transport error. A stream dropped before
/// termination frees the buffer but counts as neither.
fn event_stream(
    response: reqwest::Response,
    pool: Arc<BufferPool>,
    stats: Arc<ClientStats>,
    deadline: Instant,
    permit: OwnedSemaphorePermit,
) -> impl Stream<Item = Result<Value, ClientError>> + Send {
    try_stream! {
        let _permit = permit;
        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = SseDecoder::new(pool.acquire());

        'read: loop {
            while let Some(payload) = decoder.next_frame() {
                if is_done_marker(&payload) {
                    break 'read;
                }
                match serde_json::from_str::<Value>(&payload) {
                    Ok(event) => {
                        yield event;
                    }
                    Err(err) => debug!(error = %err, "dropping malformed stream frame"),
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                pool.release(decoder.take_buffer());
                stats.record_failure();
                Err::<(), _>(ClientError::StreamTimeout)?;
            }

            match timeout(remaining, body.next()).await {
                Ok(Some(Ok(chunk))) => decoder.push(&chunk),
                Ok(Some(Err(err))) => {
                    pool.release(decoder.take_buffer());
                    stats.record_failure();
                    let mapped = if err.is_timeout() {
                        ClientError::StreamTimeout
                    } else {
                        ClientError::Http(err)
                    };
                    Err::<(), _>(mapped)?;
                }
                Ok(None) => break 'read,
                Err(_) => {
                    pool.release(decoder.take_buffer());
                    stats.record_failure();
                    Err::<(), _>(ClientError::StreamTimeout)?;
                }
            }
        }

        pool.release(decoder.take_buffer());
        stats.record_success();
    }
}

/// Key identifying one logical call across all of its retry attempts, letting
/// the backend deduplicate. Format: `<client-tag>-<millis>-<random-suffix>`.
fn idempotency_key() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{CLIENT_TAG}-{millis}-{}", &suffix[..9])
}

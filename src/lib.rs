//! # swiftlm - Deadline-Aware Chat-Completion Client
//!
//! A small, high-throughput Rust client for remote text-generation
//! (chat-completion) backends, built around a strict resource discipline:
//!
//! - One absolute deadline per logical call, propagated to every attempt,
//!   sleep and stream read
//! - Bounded concurrency through a counting semaphore
//! - Jittered exponential backoff for transient failures, with
//!   server-specified `Retry-After` taking precedence on 429
//! - A single connection-pooled transport session reused across requests
//! - Pull-based Server-Sent-Events streaming with buffer reuse
//!
//! ## Example
//! ```no_run
//! use std::time::{Duration, Instant};
//! use swiftlm::{Client, ClientConfig, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new("http://localhost:3000"));
//!
//!     let messages = vec![Message::user("Hello!")];
//!     let deadline = Instant::now() + Duration::from_secs(10);
//!
//!     let response = client.chat_completion(messages, deadline).await?;
//!     println!("{:?}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! Streaming works the same way, yielding decoded events on demand:
//! ```no_run
//! # use std::time::{Duration, Instant};
//! # use swiftlm::{Client, ClientConfig, Message};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use futures::StreamExt;
//!
//! let client = Client::new(ClientConfig::default());
//! let deadline = Instant::now() + Duration::from_secs(30);
//! let mut events = client
//!     .stream_chat_completion(vec![Message::user("Hi")], deadline)
//!     .await?;
//! while let Some(event) = events.next().await {
//!     println!("{}", event?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod pool;
pub mod sse;
pub mod stats;

pub use client::{Client, EventStream};
pub use config::ClientConfig;
pub use error::ClientError;
pub use model::{ChatCompletion, Choice, Message, Usage};
pub use stats::StatsSnapshot;

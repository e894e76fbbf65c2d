//! Streaming client for a local `llama-server` style `/completion` endpoint.
//!
//! This crate owns request building, endpoint normalization, event-stream
//! parsing, retry/backoff and cooperative cancellation. Prompt assembly lives
//! in `chat_context`; nothing here knows about sessions or terminals.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod stream;
pub mod url;

pub use client::{CancellationSignal, CompletionApiClient, StreamResult};
pub use config::CompletionApiConfig;
pub use error::CompletionApiError;
pub use events::{CompletionEvent, StreamOutcome};
pub use payload::CompletionRequest;
pub use retry::RetryPolicy;
pub use sse::SseLineParser;
pub use stream::CompletionStream;
pub use url::normalize_completion_url;

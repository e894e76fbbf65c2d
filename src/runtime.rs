//! Bridges the synchronous shell to the async completion client.

use chat_context::CancelSignal;
use completion_api::{
    CompletionApiClient, CompletionApiConfig, CompletionApiError, CompletionRequest,
    StreamOutcome,
};
use thiserror::Error;

use crate::app::ChatSession;

/// Seam between the turn flow and the transport.
pub trait CompletionBackend {
    fn complete(
        &self,
        prompt: &str,
        temperature: f64,
        cancel: &CancelSignal,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<StreamOutcome, CompletionApiError>;
}

#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error("failed to build completion client: {0}")]
    Client(#[from] CompletionApiError),

    #[error("failed to initialize tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// HTTP backend that drives one completion at a time on a current-thread runtime.
#[derive(Debug)]
pub struct HttpBackend {
    client: CompletionApiClient,
    runtime: tokio::runtime::Runtime,
    n_predict: u32,
}

impl HttpBackend {
    pub fn new(config: CompletionApiConfig, n_predict: u32) -> Result<Self, BackendInitError> {
        let client = CompletionApiClient::new(config)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            client,
            runtime,
            n_predict,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.client.normalized_endpoint()
    }
}

impl CompletionBackend for HttpBackend {
    fn complete(
        &self,
        prompt: &str,
        temperature: f64,
        cancel: &CancelSignal,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<StreamOutcome, CompletionApiError> {
        let request = CompletionRequest::new(prompt)
            .with_max_tokens(self.n_predict)
            .with_temperature(temperature);

        self.runtime
            .block_on(self.client.stream_with_handler(&request, Some(cancel), on_delta))
    }
}

/// How one chat turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    Completed {
        reply: String,
        outcome: StreamOutcome,
    },
    Cancelled,
    Failed {
        message: String,
    },
}

/// Send `user_text` and stream the reply through `on_delta`.
///
/// Only a completed stream adds an assistant turn; cancellation and errors
/// leave the history as prepared (user turn appended, trimmed to budget).
pub fn run_turn(
    session: &mut ChatSession,
    backend: &dyn CompletionBackend,
    user_text: &str,
    cancel: &CancelSignal,
    on_delta: &mut dyn FnMut(&str),
) -> TurnResult {
    let prepared = session.prepare_turn(user_text);
    let mut buffer = String::new();

    let result = backend.complete(
        &prepared.prompt,
        session.state().temperature,
        cancel,
        &mut |delta| {
            buffer.push_str(delta);
            on_delta(delta);
        },
    );

    match result {
        Ok(StreamOutcome::Cancelled) | Err(CompletionApiError::Cancelled) => {
            tracing::info!(partial_chars = buffer.chars().count(), "completion cancelled");
            TurnResult::Cancelled
        }
        Ok(outcome) => {
            session.commit_reply(&buffer);
            TurnResult::Completed {
                reply: buffer.trim().to_owned(),
                outcome,
            }
        }
        Err(error) => {
            tracing::warn!(%error, "completion failed");
            TurnResult::Failed {
                message: error.to_string(),
            }
        }
    }
}

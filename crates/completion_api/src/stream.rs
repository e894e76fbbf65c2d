use std::collections::VecDeque;

use futures_util::Stream;
use reqwest::Response;

use crate::client::{await_or_cancel, is_cancelled, CancellationSignal, CompletionApiClient};
use crate::error::{describe_error, CompletionApiError};
use crate::events::{CompletionEvent, StreamOutcome};
use crate::payload::CompletionRequest;
use crate::sse::SseLineParser;

#[derive(Debug)]
enum StreamState {
    /// Waiting for a successful response; loops through the retry policy.
    Connecting,
    /// Reading the body of the accepted response.
    Streaming { response: Response },
    /// Terminal outcome known; buffered deltas are still being handed out.
    Draining(StreamOutcome),
    Done(StreamOutcome),
}

/// Lazy, finite, non-restartable sequence of content deltas for one request.
///
/// Cancellation ends the sequence without an error. A body failure before any
/// delta was handed out reconnects under the shared retry budget; after that it
/// is reported as [`CompletionApiError::StreamInterrupted`].
#[derive(Debug)]
pub struct CompletionStream<'a> {
    client: &'a CompletionApiClient,
    request: CompletionRequest,
    cancellation: Option<CancellationSignal>,
    state: StreamState,
    parser: SseLineParser,
    pending: VecDeque<String>,
    next_attempt: u32,
    yielded: bool,
}

impl<'a> CompletionStream<'a> {
    pub(crate) fn new(
        client: &'a CompletionApiClient,
        request: CompletionRequest,
        cancellation: Option<CancellationSignal>,
    ) -> Self {
        Self {
            client,
            request,
            cancellation,
            state: StreamState::Connecting,
            parser: SseLineParser::default(),
            pending: VecDeque::new(),
            next_attempt: 0,
            yielded: false,
        }
    }

    /// Terminal outcome, once the sequence has ended.
    pub fn outcome(&self) -> Option<StreamOutcome> {
        match self.state {
            StreamState::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Count of malformed frames skipped so far.
    pub fn skipped_frames(&self) -> usize {
        self.parser.skipped_frames()
    }

    /// Next content delta, or `None` once the stream has ended.
    pub async fn next_delta(&mut self) -> Option<Result<String, CompletionApiError>> {
        loop {
            if matches!(self.state, StreamState::Done(_)) {
                return None;
            }

            if is_cancelled(self.cancellation.as_ref()) {
                self.finish(StreamOutcome::Cancelled);
                return None;
            }

            if let Some(delta) = self.pending.pop_front() {
                self.yielded = true;
                return Some(Ok(delta));
            }

            match &mut self.state {
                StreamState::Done(_) => return None,
                StreamState::Draining(outcome) => {
                    let outcome = *outcome;
                    self.finish(outcome);
                    return None;
                }
                StreamState::Connecting => {
                    let sent = self
                        .client
                        .send_from_attempt(
                            &self.request,
                            self.next_attempt,
                            self.cancellation.as_ref(),
                        )
                        .await;
                    match sent {
                        Ok((response, attempt)) => {
                            self.next_attempt = attempt + 1;
                            self.parser = SseLineParser::default();
                            self.state = StreamState::Streaming { response };
                        }
                        Err(CompletionApiError::Cancelled) => {
                            self.finish(StreamOutcome::Cancelled);
                            return None;
                        }
                        Err(error) => {
                            self.finish(StreamOutcome::Failed);
                            return Some(Err(error));
                        }
                    }
                }
                StreamState::Streaming { response } => {
                    let chunk = await_or_cancel(response.chunk(), self.cancellation.as_ref()).await;
                    match chunk {
                        Err(_) => {
                            self.finish(StreamOutcome::Cancelled);
                            return None;
                        }
                        Ok(Ok(Some(chunk))) => {
                            let events = self.parser.feed(&chunk);
                            self.accept(events);
                        }
                        Ok(Ok(None)) => {
                            let events = self.parser.finish();
                            self.accept(events);
                            if matches!(self.state, StreamState::Streaming { .. }) {
                                tracing::debug!("completion stream ended without a stop frame");
                                self.state = StreamState::Draining(StreamOutcome::Ended);
                            }
                        }
                        Ok(Err(error)) => {
                            if let Some(error) = self.on_body_error(error).await {
                                self.finish(StreamOutcome::Failed);
                                return Some(Err(error));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Adapt into a `futures` stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, CompletionApiError>> + 'a {
        futures_util::stream::unfold(self, |mut stream| async move {
            let item = stream.next_delta().await?;
            Some((item, stream))
        })
    }

    fn accept(&mut self, events: Vec<CompletionEvent>) {
        for event in events {
            match event {
                CompletionEvent::ContentDelta(text) => self.pending.push_back(text),
                CompletionEvent::StreamStop => {
                    self.state = StreamState::Draining(StreamOutcome::Stopped);
                    return;
                }
            }
        }
    }

    /// Decide between reconnecting and failing after a body read error.
    /// Returns the terminal error, or `None` when the stream should continue.
    async fn on_body_error(&mut self, error: reqwest::Error) -> Option<CompletionApiError> {
        if error.is_timeout() {
            return Some(CompletionApiError::Timeout {
                after: self.client.config().timeout,
            });
        }

        let message = describe_error(&error);
        if self.yielded {
            return Some(CompletionApiError::StreamInterrupted { message });
        }

        let failed_attempt = self.next_attempt.saturating_sub(1);
        if !self.client.config().retry.allows_retry(failed_attempt) {
            return Some(CompletionApiError::Connection {
                attempts: self.next_attempt,
                last_error: message,
            });
        }

        tracing::warn!(attempt = failed_attempt, error = %message, "completion body failed before content, reconnecting");
        self.state = StreamState::Connecting;
        match self
            .client
            .backoff(failed_attempt, self.cancellation.as_ref())
            .await
        {
            Ok(()) => None,
            Err(_) => {
                self.finish(StreamOutcome::Cancelled);
                None
            }
        }
    }

    fn finish(&mut self, outcome: StreamOutcome) {
        self.pending.clear();
        if self.parser.skipped_frames() > 0 {
            tracing::debug!(
                skipped = self.parser.skipped_frames(),
                "completion stream skipped malformed frames"
            );
        }
        self.state = StreamState::Done(outcome);
        tracing::debug!(outcome = outcome.as_str(), "completion stream finished");
    }
}

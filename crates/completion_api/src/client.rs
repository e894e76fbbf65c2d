use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

pub use chat_context::CancelSignal as CancellationSignal;

use crate::config::CompletionApiConfig;
use crate::error::{describe_error, parse_error_message, CompletionApiError};
use crate::events::StreamOutcome;
use crate::headers::build_headers;
use crate::payload::CompletionRequest;
use crate::retry::{is_retryable_http_error, is_retryable_transport_error};
use crate::stream::CompletionStream;
use crate::url::normalize_completion_url;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct CompletionApiClient {
    http: Client,
    config: CompletionApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    pub deltas: Vec<String>,
    pub outcome: StreamOutcome,
}

impl StreamResult {
    pub fn text(&self) -> String {
        self.deltas.concat()
    }
}

impl CompletionApiClient {
    pub fn new(config: CompletionApiConfig) -> Result<Self, CompletionApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let http = builder.build().map_err(CompletionApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_completion_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, CompletionApiError> {
        let headers = build_headers(&self.config);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    CompletionApiError::InvalidHeader(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    CompletionApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<reqwest::RequestBuilder, CompletionApiError> {
        validate_request(request)?;

        let endpoint = self.normalized_endpoint();
        reqwest::Url::parse(&endpoint)
            .map_err(|error| CompletionApiError::InvalidEndpoint(format!("{endpoint}: {error}")))?;

        let headers = self.build_headers()?;
        let payload = request_with_transport_defaults(request);
        Ok(self.http.post(endpoint).headers(headers).json(&payload))
    }

    /// Send the request, retrying connection-level failures and retryable
    /// statuses under the configured policy.
    pub async fn send_with_retry(
        &self,
        request: &CompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, CompletionApiError> {
        self.send_from_attempt(request, 0, cancellation)
            .await
            .map(|(response, _)| response)
    }

    /// Retry loop starting at zero-based `first_attempt`, so a caller that
    /// reconnects shares one budget. Returns the attempt index that succeeded.
    pub(crate) async fn send_from_attempt(
        &self,
        request: &CompletionRequest,
        first_attempt: u32,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(Response, u32), CompletionApiError> {
        let policy = self.config.retry;
        let mut last_error = None;

        for attempt in first_attempt..policy.max_attempts() {
            if is_cancelled(cancellation) {
                return Err(CompletionApiError::Cancelled);
            }

            let builder = self.build_request(request)?;
            tracing::debug!(attempt, endpoint = %self.normalized_endpoint(), "sending completion request");

            match await_or_cancel(builder.send(), cancellation).await? {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok((response, attempt));
                    }

                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);

                    if policy.allows_retry(attempt)
                        && is_retryable_http_error(status.as_u16(), &body)
                    {
                        tracing::warn!(attempt, %status, %message, "retryable completion status");
                        self.backoff(attempt, cancellation).await?;
                        continue;
                    }

                    return Err(CompletionApiError::Status(status, message));
                }
                Err(error) => {
                    if error.is_timeout() && !error.is_connect() {
                        return Err(CompletionApiError::Timeout {
                            after: self.config.timeout,
                        });
                    }
                    if !is_retryable_transport_error(&error) {
                        return Err(CompletionApiError::Request(error));
                    }

                    let message = describe_error(&error);
                    tracing::warn!(attempt, error = %message, "completion connection failed");
                    if policy.allows_retry(attempt) {
                        last_error = Some(message);
                        self.backoff(attempt, cancellation).await?;
                        continue;
                    }
                    return Err(CompletionApiError::Connection {
                        attempts: attempt + 1,
                        last_error: message,
                    });
                }
            }
        }

        Err(CompletionApiError::Connection {
            attempts: policy.max_attempts().max(first_attempt),
            last_error: last_error.unwrap_or_else(|| "retry budget exhausted".to_owned()),
        })
    }

    pub(crate) async fn backoff(
        &self,
        attempt: u32,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(), CompletionApiError> {
        let delay = self.config.retry.delay_for(attempt);
        await_or_cancel(tokio::time::sleep(delay), cancellation).await
    }

    /// Lazy stream of content deltas. Nothing is sent until the first poll.
    pub fn stream_completion(
        &self,
        request: &CompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<CompletionStream<'_>, CompletionApiError> {
        validate_request(request)?;
        Ok(CompletionStream::new(
            self,
            request.clone(),
            cancellation.cloned(),
        ))
    }

    pub async fn stream_with_handler<F>(
        &self,
        request: &CompletionRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_delta: F,
    ) -> Result<StreamOutcome, CompletionApiError>
    where
        F: FnMut(&str),
    {
        let mut stream = self.stream_completion(request, cancellation)?;
        while let Some(delta) = stream.next_delta().await {
            on_delta(&delta?);
        }

        Ok(stream.outcome().unwrap_or(StreamOutcome::Ended))
    }

    pub async fn stream(
        &self,
        request: &CompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, CompletionApiError> {
        let mut deltas = Vec::new();
        let outcome = self
            .stream_with_handler(request, cancellation, |delta| {
                deltas.push(delta.to_owned());
            })
            .await?;

        Ok(StreamResult { deltas, outcome })
    }
}

fn request_with_transport_defaults(request: &CompletionRequest) -> CompletionRequest {
    let mut payload = request.clone();
    payload.stream = true;
    payload
}

fn validate_request(request: &CompletionRequest) -> Result<(), CompletionApiError> {
    if !request.temperature.is_finite() {
        return Err(CompletionApiError::InvalidRequest(format!(
            "temperature must be finite, got {}",
            request.temperature
        )));
    }
    if request.stop.iter().any(String::is_empty) {
        return Err(CompletionApiError::InvalidRequest(
            "stop sequences must not be empty".to_owned(),
        ));
    }
    Ok(())
}

pub(crate) fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

pub(crate) async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, CompletionApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(CompletionApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(CompletionApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

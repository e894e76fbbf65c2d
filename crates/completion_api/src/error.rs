use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum CompletionApiError {
    InvalidEndpoint(String),
    InvalidRequest(String),
    InvalidHeader(String),
    /// Non-retryable transport failure.
    Request(reqwest::Error),
    /// Connection-level failures persisted past the retry budget.
    Connection {
        attempts: u32,
        last_error: String,
    },
    Status(StatusCode, String),
    /// The body failed after content was already delivered to the caller.
    StreamInterrupted {
        message: String,
    },
    /// The overall request ceiling elapsed.
    Timeout {
        after: Option<Duration>,
    },
    Serde(JsonError),
    Cancelled,
}

impl CompletionApiError {
    /// True for failures that happened before the server accepted the request.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    pub fn message_or_fallback(&self) -> Option<String> {
        let message = self.message.as_deref().map(str::trim).filter(|value| !value.is_empty());
        let kind = self.type_.as_deref().map(str::trim).filter(|value| !value.is_empty());

        match (message, kind) {
            (Some(message), Some(kind)) => Some(format!("{message} ({kind})")),
            (Some(message), None) => Some(message.to_owned()),
            (None, Some(kind)) => Some(kind.to_owned()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for CompletionApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndpoint(value) => write!(f, "invalid completion endpoint: {value}"),
            Self::InvalidRequest(message) => write!(f, "invalid completion request: {message}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {}", describe_error(error)),
            Self::Connection {
                attempts,
                last_error,
            } => write!(
                f,
                "could not reach completion server after {attempts} attempt(s): {last_error}"
            ),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::StreamInterrupted { message } => {
                write!(f, "completion stream interrupted: {message}")
            }
            Self::Timeout { after } => match after {
                Some(after) => write!(f, "completion timed out after {}s", after.as_secs()),
                None => write!(f, "completion timed out"),
            },
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for CompletionApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for CompletionApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Render an error with its full source chain, e.g. `error sending request: connection refused`.
pub fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    let fallback = || {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload { value: Some(error) }) => {
            error.message_or_fallback().unwrap_or_else(fallback)
        }
        _ => fallback(),
    }
}

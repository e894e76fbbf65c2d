use serde_json::Value;

/// Event decoded from one `data:` line of the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    ContentDelta(String),
    StreamStop,
}

impl CompletionEvent {
    /// Map a decoded frame object to an event.
    ///
    /// `stop == true` wins over any content carried by the same frame; frames
    /// with neither a stop flag nor non-empty content produce nothing.
    pub fn from_frame(value: &Value) -> Option<Self> {
        if value.get("stop").and_then(Value::as_bool) == Some(true) {
            return Some(Self::StreamStop);
        }

        value
            .get("content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .map(|content| Self::ContentDelta(content.to_owned()))
    }
}

/// How a completion stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server sent a `stop` frame.
    Stopped,
    /// The body ended without a `stop` frame.
    Ended,
    /// The caller's cancellation signal fired.
    Cancelled,
    /// A terminal error was returned to the caller.
    Failed,
}

impl StreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// True when the full answer was delivered.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Stopped | Self::Ended)
    }
}

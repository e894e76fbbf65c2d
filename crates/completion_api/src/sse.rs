use std::fmt;

use serde_json::Value;

use crate::events::CompletionEvent;

/// Why a `data:` payload was skipped.
#[derive(Debug)]
pub enum FrameError {
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(error) => write!(f, "invalid frame json: {error}"),
            Self::NotAnObject => write!(f, "frame payload is not a JSON object"),
        }
    }
}

/// Incremental, line-oriented parser for the completion event stream.
///
/// Bytes are buffered until a `\n` arrives so multi-byte characters split
/// across network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseLineParser {
    buffer: Vec<u8>,
    skipped: usize,
}

impl SseLineParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<CompletionEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.push_line(&line[..newline], &mut events);
        }

        events
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<CompletionEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.push_line(&line, &mut events);
        }
        events
    }

    /// Parse a complete payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<CompletionEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    /// Number of `data:` payloads dropped because they did not decode.
    pub fn skipped_frames(&self) -> usize {
        self.skipped
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }

    fn push_line(&mut self, raw: &[u8], events: &mut Vec<CompletionEvent>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        let Some(payload) = extract_data_payload(&line) else {
            return;
        };

        match parse_data_payload(payload) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(error) => {
                self.skipped += 1;
                tracing::debug!(%error, payload, "skipping malformed completion frame");
            }
        }
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    Some(payload)
}

/// Decode one `data:` payload into an event, if it carries one.
pub fn parse_data_payload(payload: &str) -> Result<Option<CompletionEvent>, FrameError> {
    let value = serde_json::from_str::<Value>(payload).map_err(FrameError::Json)?;
    if !value.is_object() {
        return Err(FrameError::NotAnObject);
    }
    Ok(CompletionEvent::from_frame(&value))
}

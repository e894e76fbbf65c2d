use chat_context::Turn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODE: &str = "default";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const DEFAULT_MAX_CTX_CHARS: usize = 12_000;
pub const MIN_CTX_CHARS: usize = 2_000;

/// Clamp a sampling temperature into `[0, 2]`; non-finite values fall back to the default.
#[must_use]
pub fn clamp_temperature(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    } else {
        DEFAULT_TEMPERATURE
    }
}

#[must_use]
pub fn clamp_max_ctx_chars(value: usize) -> usize {
    value.max(MIN_CTX_CHARS)
}

/// Runtime state of one chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub session_id: String,
    pub mode: String,
    pub temperature: f64,
    pub max_ctx_chars: usize,
    pub turns: Vec<Turn>,
}

impl SessionState {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            mode: DEFAULT_MODE.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_ctx_chars: DEFAULT_MAX_CTX_CHARS,
            turns: Vec::new(),
        }
    }
}

/// On-disk shape of a session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_ctx_chars")]
    pub max_ctx_chars: usize,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

fn default_mode() -> String {
    DEFAULT_MODE.to_owned()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_ctx_chars() -> usize {
    DEFAULT_MAX_CTX_CHARS
}

impl SessionRecord {
    #[must_use]
    pub fn from_state(state: &SessionState, saved_at: impl Into<String>) -> Self {
        Self {
            session_id: state.session_id.clone(),
            mode: state.mode.clone(),
            temperature: state.temperature,
            max_ctx_chars: state.max_ctx_chars,
            turns: state.turns.clone(),
            saved_at: Some(saved_at.into()),
        }
    }

    /// Convert into runtime state, clamping out-of-range settings.
    #[must_use]
    pub fn into_state(self) -> SessionState {
        let mode = if self.mode.trim().is_empty() {
            default_mode()
        } else {
            self.mode
        };

        SessionState {
            session_id: self.session_id,
            mode,
            temperature: clamp_temperature(self.temperature),
            max_ctx_chars: clamp_max_ctx_chars(self.max_ctx_chars),
            turns: self.turns,
        }
    }
}

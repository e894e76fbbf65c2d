use chat_context::IM_END;
use serde::{Deserialize, Serialize};

/// Default number of tokens to predict.
pub const DEFAULT_N_PREDICT: u32 = 512;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Request body for the `/completion` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(rename = "n_predict")]
    pub max_tokens: u32,
    pub temperature: f64,
    /// Stop sequences; unique, in insertion order.
    #[serde(default)]
    pub stop: Vec<String>,
    /// Default: true.
    #[serde(default = "default_true")]
    pub stream: bool,
}

fn default_true() -> bool {
    true
}

impl CompletionRequest {
    /// Streaming request with the chat end-of-turn marker as stop sequence.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_N_PREDICT,
            temperature: DEFAULT_TEMPERATURE,
            stop: vec![IM_END.to_string()],
            stream: true,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Add a stop sequence unless already present.
    pub fn with_stop(mut self, sequence: impl Into<String>) -> Self {
        let sequence = sequence.into();
        if !self.stop.contains(&sequence) {
            self.stop.push(sequence);
        }
        self
    }

    /// Replace the stop sequences, dropping duplicates.
    pub fn with_stop_sequences<I, S>(mut self, sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop.clear();
        for sequence in sequences {
            self = self.with_stop(sequence);
        }
        self
    }
}

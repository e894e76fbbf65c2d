//! Conversation history types and prompt assembly for a local completion server.
//!
//! This crate owns the model-facing shape of a chat: ordered [`Turn`]s, the
//! ChatML-style prompt template the server expects, and the character-budget
//! trimming policy applied before each request. It performs no I/O.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde::{Deserialize, Serialize};

mod prompt;
mod trim;

pub use prompt::{build_prompt, ASSISTANT_OPEN, IM_END, IM_START};
pub use trim::{prompt_len, trim_to_budget, TrimmedContext};

/// Shared cancellation flag for one in-flight completion.
pub type CancelSignal = Arc<AtomicBool>;

/// Speaker of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Role label as it appears inside the chat markup.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

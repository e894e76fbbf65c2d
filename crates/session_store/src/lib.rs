//! One-JSON-file-per-session persistence for chat sessions.

mod error;
mod paths;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{session_file_name, session_root, validate_session_id, SESSION_DIR};
pub use schema::{
    clamp_max_ctx_chars, clamp_temperature, SessionRecord, SessionState, DEFAULT_MAX_CTX_CHARS,
    DEFAULT_MODE, DEFAULT_TEMPERATURE, MAX_TEMPERATURE, MIN_CTX_CHARS, MIN_TEMPERATURE,
};
pub use store::{
    new_session_id, now_rfc3339, parse_saved_at, session_id_at, LoadedSession, SessionStore,
};

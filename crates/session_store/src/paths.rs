use std::path::{Path, PathBuf};

use crate::error::SessionStoreError;

pub const SESSION_DIR: &str = "sessions";
pub const SESSION_FILE_EXTENSION: &str = "json";

#[must_use]
pub fn session_root(home: &Path) -> PathBuf {
    home.join(SESSION_DIR)
}

#[must_use]
pub fn session_file_name(session_id: &str) -> String {
    format!("{session_id}.{SESSION_FILE_EXTENSION}")
}

/// Reject ids that would escape the session directory or name a hidden file.
pub fn validate_session_id(session_id: &str) -> Result<(), SessionStoreError> {
    if session_id.trim().is_empty() {
        return Err(SessionStoreError::invalid_id(session_id, "must not be empty"));
    }
    if session_id.contains(['/', '\\', '\0']) {
        return Err(SessionStoreError::invalid_id(
            session_id,
            "must not contain path separators",
        ));
    }
    if session_id.contains("..") {
        return Err(SessionStoreError::invalid_id(session_id, "must not contain '..'"));
    }
    if session_id.starts_with('.') {
        return Err(SessionStoreError::invalid_id(
            session_id,
            "must not start with '.'",
        ));
    }
    Ok(())
}

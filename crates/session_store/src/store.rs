use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::paths::{session_file_name, validate_session_id, SESSION_FILE_EXTENSION};
use crate::schema::{SessionRecord, SessionState};

/// A session read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub state: SessionState,
    /// When the file was last written, if it records that.
    pub saved_at: Option<OffsetDateTime>,
    pub path: PathBuf,
}

/// Directory of `<session_id>.json` files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, SessionStoreError> {
        validate_session_id(session_id)?;
        Ok(self.root.join(session_file_name(session_id)))
    }

    /// Write the session as pretty JSON, replacing any previous file atomically.
    pub fn save(&self, state: &SessionState) -> Result<PathBuf, SessionStoreError> {
        let path = self.path_for(&state.session_id)?;
        fs::create_dir_all(&self.root).map_err(|source| {
            SessionStoreError::io("creating session directory", &self.root, source)
        })?;

        let record = SessionRecord::from_state(state, now_rfc3339()?);
        let mut body = serde_json::to_vec_pretty(&record)
            .map_err(|source| SessionStoreError::serialize(&path, source))?;
        body.push(b'\n');

        let temp_path = self.root.join(format!(
            ".{}.{}.tmp",
            state.session_id,
            Uuid::new_v4().simple()
        ));
        if let Err(error) = write_synced(&temp_path, &body) {
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }
        if let Err(source) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(SessionStoreError::io("replacing session file", &path, source));
        }

        Ok(path)
    }

    pub fn load(&self, session_id: &str) -> Result<LoadedSession, SessionStoreError> {
        let path = self.path_for(session_id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(SessionStoreError::NotFound {
                    session_id: session_id.to_owned(),
                    path,
                });
            }
            Err(source) => {
                return Err(SessionStoreError::io("reading session file", &path, source));
            }
        };

        let record = serde_json::from_str::<SessionRecord>(&text)
            .map_err(|source| SessionStoreError::corrupt(&path, source.to_string()))?;
        if let Err(error) = validate_session_id(&record.session_id) {
            return Err(SessionStoreError::corrupt(&path, error.to_string()));
        }

        let saved_at = match record.saved_at.as_deref() {
            Some(value) => Some(parse_saved_at(value).ok_or_else(|| {
                SessionStoreError::corrupt(&path, format!("invalid saved_at timestamp: {value}"))
            })?),
            None => None,
        };

        Ok(LoadedSession {
            state: record.into_state(),
            saved_at,
            path,
        })
    }

    /// Saved session ids, newest first. A missing directory lists nothing.
    pub fn list(&self) -> Result<Vec<String>, SessionStoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SessionStoreError::io(
                    "listing session directory",
                    &self.root,
                    source,
                ));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                SessionStoreError::io("listing session directory", &self.root, source)
            })?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_FILE_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !stem.starts_with('.') {
                    ids.push(stem.to_owned());
                }
            }
        }

        ids.sort_unstable_by(|left, right| right.cmp(left));
        Ok(ids)
    }
}

fn write_synced(path: &Path, body: &[u8]) -> Result<(), SessionStoreError> {
    let mut file = File::create(path)
        .map_err(|source| SessionStoreError::io("creating temporary session file", path, source))?;
    file.write_all(body)
        .map_err(|source| SessionStoreError::io("writing session file", path, source))?;
    file.sync_all()
        .map_err(|source| SessionStoreError::io("syncing session file", path, source))
}

/// Session id for the given instant, `YYYYMMDD-HHMMSS` in UTC.
pub fn session_id_at(instant: OffsetDateTime) -> Result<String, SessionStoreError> {
    instant
        .to_offset(time::UtcOffset::UTC)
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .map_err(SessionStoreError::ClockFormat)
}

pub fn new_session_id() -> Result<String, SessionStoreError> {
    session_id_at(OffsetDateTime::now_utc())
}

pub fn now_rfc3339() -> Result<String, SessionStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionStoreError::ClockFormat)
}

/// Parse a `saved_at` value: RFC 3339, or the older `YYYY-MM-DD HH:MM:SS`
/// form which is read as UTC.
#[must_use]
pub fn parse_saved_at(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }

    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

//! File-backed `tracing` setup.
//!
//! Chat output owns stdout, so diagnostics go to `<home>/localgpt.log`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to install log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Parse an `EnvFilter` directive such as `warn` or `completion_api=debug`.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_owned(),
        source,
    })
}

/// Install the global subscriber, appending to `path`.
pub fn init_logging(path: &Path, directive: &str) -> Result<(), LoggingError> {
    let filter = parse_filter(directive)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LoggingError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(file)),
        )
        .with(filter)
        .try_init()?;

    tracing::debug!(path = %path.display(), "logging initialized");
    Ok(())
}

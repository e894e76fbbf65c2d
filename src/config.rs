//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use completion_api::payload::DEFAULT_N_PREDICT;
use completion_api::url::{DEFAULT_HOST, DEFAULT_PORT};
use completion_api::CompletionApiConfig;
use session_store::session_root;
use thiserror::Error;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const HOME_ENV: &str = "LOCALGPT_HOME";
pub const N_PREDICT_ENV: &str = "LOCALGPT_N_PREDICT";
pub const TIMEOUT_ENV: &str = "LOCALGPT_TIMEOUT_SECS";
pub const LOG_ENV: &str = "LOCALGPT_LOG";

pub const DEFAULT_HOME_DIR: &str = ".localgpt";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const LOG_FILE_NAME: &str = "localgpt.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot locate a home directory; set LOCALGPT_HOME")]
    NoHomeDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub host: String,
    pub port: u16,
    pub home: PathBuf,
    pub n_predict: u32,
    pub timeout: Duration,
    pub log_filter: String,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = match env_string_opt(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(DEFAULT_HOME_DIR),
        };

        let timeout_secs = env_parse(TIMEOUT_ENV, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: TIMEOUT_ENV,
                value: timeout_secs.to_string(),
                reason: "must be greater than zero".to_owned(),
            });
        }

        Ok(Self {
            host: env_string_opt(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: env_parse(PORT_ENV, DEFAULT_PORT)?,
            home,
            n_predict: env_parse(N_PREDICT_ENV, DEFAULT_N_PREDICT)?,
            timeout: Duration::from_secs(timeout_secs),
            log_filter: env_string_opt(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
        })
    }

    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        session_root(&self.home)
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.home.join(LOG_FILE_NAME)
    }

    /// Transport settings for the completion server.
    #[must_use]
    pub fn completion_config(&self) -> CompletionApiConfig {
        CompletionApiConfig::for_host(&self.host, self.port)
            .with_timeout(self.timeout)
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_owned())
        }
    })
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string_opt(key) {
        Some(value) => value.parse().map_err(|error: T::Err| ConfigError::Invalid {
            key,
            reason: error.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

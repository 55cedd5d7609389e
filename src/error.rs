//! Error taxonomy for the ingestion pipeline.
//!
//! Everything except [`ConfigError`] is recoverable: it is logged where it
//! happens and never propagates past its own source or item.

use std::path::PathBuf;

/// Failure to retrieve or decode one source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("fetch timed out after {secs}s")]
    Timeout { secs: u64 },

    /// `status` is `None` for transport-level failures (DNS, connect, reset).
    #[error("http error (status {status:?}): {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    #[error("malformed payload: {0}")]
    Parse(String),
}

impl FetchError {
    /// Timeouts, transport failures, 408, 429 and 5xx are worth another try.
    /// Malformed payloads and other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Http { status: None, .. } => true,
            FetchError::Http {
                status: Some(code), ..
            } => *code == 408 || *code == 429 || (500..=599).contains(code),
            FetchError::Parse(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Http { .. } => "http",
            FetchError::Parse(_) => "parse",
        }
    }
}

/// Translation backend failure. Cloned to every caller waiting on the same key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslationError {
    #[error("translation timed out")]
    Timeout,
    #[error("translation backend error: {0}")]
    Backend(String),
    #[error("unexpected translation response: {0}")]
    BadResponse(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassificationError {
    #[error("nothing to classify")]
    EmptyInput,
    #[error("classifier timed out")]
    Timeout,
    #[error("classifier backend error: {0}")]
    Backend(String),
    #[error("unexpected classifier response: {0}")]
    BadResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<libsql::Error> for PersistenceError {
    fn from(e: libsql::Error) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}

/// Startup-only failures. Never raised mid-cycle.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("country '{0}' has no configured sources")]
    UnknownCountry(String),

    #[error("source '{endpoint}' needs credential env var {var}, which is not set")]
    MissingCredential { var: String, endpoint: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

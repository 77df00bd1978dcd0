use serde::Serialize;
use thiserror::Error;

/// Why a network sub-lookup produced no data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("response body is not valid UTF-8: {0}")]
    Decode(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("no record found for {0}")]
    NotFound(String),

    #[error("invalid lookup target: {0}")]
    InvalidTarget(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),
}

/// Summary of one sub-lookup, kept alongside the record for logging and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LookupStatus {
    Succeeded,
    TimedOut,
    Failed(String),
}

impl LookupStatus {
    pub fn of<T>(result: &Result<T, LookupError>) -> Self {
        match result {
            Ok(_) => LookupStatus::Succeeded,
            Err(LookupError::Timeout(_)) => LookupStatus::TimedOut,
            Err(e) => LookupStatus::Failed(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LookupStatus::Succeeded)
    }
}

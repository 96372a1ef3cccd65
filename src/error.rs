//! Ingestion error taxonomy.
//!
//! Every error class has a fixed recovery policy:
//! - `Transport`: retried via reconnect backoff (streams) or skipped (polls).
//! - `Parse`: frame/response discarded, connection unaffected.
//! - `Validation`: update discarded before it reaches the store.
//! - `Configuration`: disables the affected adapter only; the rest of the
//!   process keeps ingesting.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

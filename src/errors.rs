use thiserror::Error;
use uuid::Uuid;

use crate::core::session::Severity;

/// Failures raised by persistence providers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage quota exceeded ({required} bytes needed, {quota} available)")]
    QuotaExceeded { required: usize, quota: usize },
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Error taxonomy for every ledger operation.
///
/// None of these are fatal: each failure path leaves the ledger in its last
/// consistent state.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("entry not found: {0}")]
    NotFound(Uuid),
    #[error("no entries selected")]
    NoSelection,
    #[error("malformed import payload: {0}")]
    MalformedPayload(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        LedgerError::MalformedPayload(message.into())
    }

    /// Severity used when this error is surfaced through the notification channel.
    pub fn severity(&self) -> Severity {
        match self {
            LedgerError::Validation(_) | LedgerError::MalformedPayload(_) => Severity::Error,
            LedgerError::NoSelection | LedgerError::Persistence(_) => Severity::Warning,
            LedgerError::NotFound(_) => Severity::Info,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;

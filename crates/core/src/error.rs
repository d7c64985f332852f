//! Error types shared by every store implementation.

use thiserror::Error;

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    ///
    /// Expected under concurrency: the caller lost a race and should re-read.
    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    /// The addressed record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The backend failed; the write may or may not have been applied.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error is a lost uniqueness race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

//! Storage error types.

use thiserror::Error;

/// Failures at the persistence boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The record to update does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same id already exists.
    #[error("record already exists: {0}")]
    Conflict(String),

    /// The backend rejected or failed the statement.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A persisted value could not be decoded.
    #[error("corrupt record {id}: {reason}")]
    Corrupt {
        /// Identifier of the unreadable record.
        id: String,
        /// What failed to decode.
        reason: String,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

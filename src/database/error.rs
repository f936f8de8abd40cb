//! Store error types

use thiserror::Error;

/// Errors raised by a `MediaStore` backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be opened or is disabled
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The backend is full; nothing more can be written
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Query failure inside the record backend
    #[error("Database error: {0}")]
    Backend(#[from] sqlx::Error),

    /// Filesystem failure while reading or writing the store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this error means the store cannot accept any further writes
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded)
    }

    /// Map an insert failure, turning SQLite's "database or disk is full" into a quota error
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        const SQLITE_FULL: &str = "13";

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(SQLITE_FULL) {
                return StoreError::QuotaExceeded;
            }
        }
        StoreError::Backend(err)
    }

    /// Map an IO failure during a write, treating a full disk as a quota error
    pub(crate) fn from_write(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::StorageFull {
            StoreError::QuotaExceeded
        } else {
            StoreError::Io(err)
        }
    }
}

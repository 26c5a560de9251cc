//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Audit action serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A referenced principal or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint fired that the caller did not anticipate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store lock could not be acquired within the configured wait.
    #[error("store busy: {0}")]
    Busy(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is a lock-wait timeout rather than a hard fault.
    pub fn is_busy(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }

    /// Classify a raw SQLite error.
    ///
    /// Busy/locked conditions become [`StoreError::Busy`], foreign-key
    /// violations become [`StoreError::NotFound`] (an edge referencing a
    /// missing principal or object), and unique violations become
    /// [`StoreError::Conflict`].
    pub(crate) fn classify(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        if let rusqlite::Error::SqliteFailure(code, ref msg) = err {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            match code.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    return StoreError::Busy(detail);
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    if code.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                        return StoreError::NotFound(detail);
                    }
                    if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    {
                        return StoreError::Conflict(detail);
                    }
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_busy() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        );
        assert!(StoreError::classify(err).is_busy());
    }

    #[test]
    fn test_classify_foreign_key() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            None,
        );
        assert!(matches!(StoreError::classify(err), StoreError::NotFound(_)));
    }

    #[test]
    fn test_classify_other_passes_through() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(StoreError::classify(err), StoreError::Database(_)));
    }
}

//! Error types for the authorization engine.

use thiserror::Error;

use takegrant_store::StoreError;

/// Errors that can occur during authorization operations.
///
/// A caller lacking a right is not an error; see [`crate::Decision`].
#[derive(Debug, Error)]
pub enum PermsError {
    /// Referenced object or principal does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write raced with another and the outcome does not match intent.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PermsError {
    /// Whether this is a bounded-wait timeout on the store lock.
    pub fn is_busy(&self) -> bool {
        matches!(self, PermsError::Store(e) if e.is_busy())
    }
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, PermsError>;

//! Error types for takegrant core.

use thiserror::Error;

/// Errors raised while parsing or validating core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown right kind: {0:?} (expected read, write or take)")]
    UnknownRightKind(String),

    #[error("unknown audit outcome: {0:?}")]
    UnknownOutcome(String),

    #[error("invalid name: {0}")]
    InvalidName(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

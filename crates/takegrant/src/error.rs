//! Error types for the system facade.

use takegrant_core::CoreError;
use takegrant_perms::PermsError;
use takegrant_store::StoreError;
use thiserror::Error;

/// Errors that can occur during system operations.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Authorization engine error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Malformed input.
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),

    /// The command needs a logged-in principal.
    #[error("you must login first")]
    NotAuthenticated,

    /// Unknown username or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Username already registered.
    #[error("user {0:?} already exists")]
    UsernameTaken(String),

    /// Object name already in use.
    #[error("object {0:?} already exists")]
    ObjectNameTaken(String),

    /// The command is restricted to administrators.
    #[error("only an admin can do this")]
    AdminRequired,

    /// Referenced object or principal does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// The command failed and its audit record could not be written either.
    #[error("{error} (audit record not written: {audit})")]
    Unaudited {
        error: Box<SystemError>,
        audit: StoreError,
    },
}

impl SystemError {
    /// The command's own error, without the audit failure wrapped around it.
    pub fn cause(&self) -> &SystemError {
        match self {
            SystemError::Unaudited { error, .. } => error.cause(),
            other => other,
        }
    }

    /// The audit write failure that accompanied this error, if any.
    pub fn audit_warning(&self) -> Option<&StoreError> {
        match self {
            SystemError::Unaudited { audit, .. } => Some(audit),
            _ => None,
        }
    }

    /// Whether the store gave up waiting for its lock.
    pub fn is_busy(&self) -> bool {
        match self.cause() {
            SystemError::Perms(e) => e.is_busy(),
            SystemError::Store(e) => e.is_busy(),
            _ => false,
        }
    }

    /// Whether this is a fault rather than a refusal.
    ///
    /// Faults are infrastructure failures; everything else is a decision
    /// about the request itself.
    pub fn is_fault(&self) -> bool {
        match self.cause() {
            SystemError::Store(_) => true,
            SystemError::PasswordHash(_) => true,
            SystemError::Perms(PermsError::Store(_)) => true,
            SystemError::Perms(PermsError::Conflict(_)) => true,
            _ => false,
        }
    }
}

/// Result type for system operations.
pub type Result<T> = std::result::Result<T, SystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unaudited_keeps_cause() {
        let err = SystemError::Unaudited {
            error: Box::new(SystemError::Store(StoreError::Busy("locked".into()))),
            audit: StoreError::Busy("audit locked".into()),
        };
        assert!(matches!(err.cause(), SystemError::Store(StoreError::Busy(_))));
        assert!(err.is_busy());
        assert!(err.is_fault());
        assert!(err.audit_warning().is_some());
        assert!(err.to_string().contains("audit record not written"));

        let plain = SystemError::AdminRequired;
        assert!(plain.audit_warning().is_none());
        assert!(!plain.is_fault());
    }
}

//! Password hashing for the identity layer.
//!
//! Passwords are stored as bcrypt strings, which carry their own salt and
//! cost. Hashing runs on the blocking pool.

use takegrant_store::Credentials;

use crate::error::{Result, SystemError};

/// Hash a password at the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<Credentials> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| SystemError::PasswordHash(format!("task failed: {}", e)))?
        .map_err(|e| SystemError::PasswordHash(e.to_string()))?;
    Ok(Credentials { hash })
}

/// Check a password against stored credentials.
///
/// Malformed stored values never verify.
pub async fn verify_password(password: &str, credentials: &Credentials) -> bool {
    let password = password.to_string();
    let hash = credentials.hash.clone();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "password check task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let creds = hash_password("pass1", COST).await.unwrap();
        assert!(creds.hash.starts_with("$2"));
        assert!(!creds.hash.contains("pass1"));
        assert!(verify_password("pass1", &creds).await);
        assert!(!verify_password("pass2", &creds).await);
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let a = hash_password("same", COST).await.unwrap();
        let b = hash_password("same", COST).await.unwrap();
        assert_ne!(a.hash, b.hash);
        assert!(verify_password("same", &a).await);
        assert!(verify_password("same", &b).await);
    }

    #[tokio::test]
    async fn test_cost_is_recorded() {
        let creds = hash_password("x", 5).await.unwrap();
        assert!(creds.hash.starts_with("$2b$05$"));
    }

    #[tokio::test]
    async fn test_invalid_cost_is_an_error() {
        let err = hash_password("x", 40).await.unwrap_err();
        assert!(matches!(err, SystemError::PasswordHash(_)));
        assert!(err.is_fault());
    }

    #[tokio::test]
    async fn test_malformed_credentials_never_verify() {
        let creds = Credentials { hash: "00".into() };
        assert!(!verify_password("", &creds).await);

        let mut good = hash_password("x", COST).await.unwrap();
        good.hash.truncate(10);
        assert!(!verify_password("x", &good).await);
    }
}

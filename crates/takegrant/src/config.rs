//! System configuration.

use std::path::PathBuf;
use std::time::Duration;

use takegrant_store::StoreConfig;

/// Configuration for a [`crate::System`].
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// SQLite database file. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    /// How long a caller waits for the store lock before failing.
    pub busy_timeout: Duration,
    /// Make the first registered principal an administrator.
    pub first_user_is_admin: bool,
    /// Records returned by `show_audit` when no limit is given.
    pub audit_page_size: usize,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout: Duration::from_secs(5),
            first_user_is_admin: true,
            audit_page_size: 20,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl SystemConfig {
    /// Default configuration backed by a database file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            busy_timeout: self.busy_timeout,
        }
    }
}

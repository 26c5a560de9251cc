//! # Takegrant
//!
//! A Take-Grant discretionary access control system: principals, shared
//! objects, a rights graph, and an audit trail of every decision.
//!
//! ## Overview
//!
//! - **Identity**: register and log in principals; the first one is an admin
//! - **Objects**: create, read, write and delete, guarded by rights
//! - **Rights**: grant, take and check over the rights graph
//! - **Audit**: one record per command, attributed to the claimed actor
//! - **Trojan**: routines that act under a victim's identity, to show that
//!   an audit trail of claimed identities cannot detect a confused deputy
//!
//! ## Usage
//!
//! ```rust,no_run
//! use takegrant::{RightKind, System, SystemConfig};
//!
//! async fn example() -> takegrant::Result<()> {
//!     let system = System::open(SystemConfig::with_path("take_grant.db"))?;
//!
//!     system.register("user1", "pass1").await?;
//!     let user2 = system.register("user2", "pass2").await?.value;
//!     let session = system.login("user1", "pass1").await?.value;
//!
//!     let file = system
//!         .create_object(Some(&session), "file1", "secret")
//!         .await?
//!         .value;
//!     let decision = system
//!         .grant(Some(&session), user2.id, file.id, RightKind::Read)
//!         .await?;
//!     if let Some(warning) = decision.audit_warning {
//!         eprintln!("grant applied but not audited: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `takegrant::core` - Data model (Right, RightsGraph, audit values)
//! - `takegrant::store` - Storage abstraction and SQLite
//! - `takegrant::perms` - Authorization engine

pub mod config;
pub mod error;
pub mod identity;
pub mod system;
pub mod trojan;

// Re-export component crates
pub use takegrant_core as core;
pub use takegrant_perms as perms;
pub use takegrant_store as store;

// Re-export main types for convenience
pub use config::SystemConfig;
pub use error::{Result, SystemError};
pub use system::{Access, Audited, Session, System};
pub use trojan::{trojan_grant, trojan_take};

pub use takegrant_core::{
    Actor, AuditAction, AuditRecord, Object, ObjectId, Outcome, Principal, PrincipalId, Right,
    RightKind,
};
pub use takegrant_perms::{Decision, Denial};

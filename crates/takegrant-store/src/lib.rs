//! # Takegrant Store
//!
//! Storage abstraction for the rights graph. Provides a trait-based interface
//! for principals, objects, edges and the audit trail, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait lets the engine stay storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for testing.
//! Audit records go through the separate [`AuditSink`] trait so a failing
//! trail never blocks a mutation.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all graph storage operations
//! - [`AuditSink`] - Append-only audit trail
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting an edge
//!
//! ## Usage
//!
//! ```rust,no_run
//! use takegrant_store::{SqliteStore, Store};
//! use takegrant_core::{ObjectId, PrincipalId, Right, RightKind};
//!
//! async fn example() -> takegrant_store::Result<()> {
//!     let store = SqliteStore::open("take_grant.db")?;
//!     let edge = Right::new(PrincipalId(1), ObjectId(1), RightKind::Read);
//!     let held = store.has_right(&edge).await?;
//!     println!("held: {}", held);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting an existing edge returns `AlreadyExists`
//! - **Guarded inserts**: Precondition edges are checked in the same transaction
//! - **No dangling edges**: Foreign keys reject edges to missing rows
//! - **Cascades**: Deleting an object or principal removes its edges

use std::time::{SystemTime, UNIX_EPOCH};

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};
pub use takegrant_core::GuardedInsert;
pub use traits::{AuditSink, Credentials, InsertResult, NewPrincipal, Store, StoreExt};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

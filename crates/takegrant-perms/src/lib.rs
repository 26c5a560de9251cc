//! # Takegrant Permissions
//!
//! The authorization engine: applies the Take-Grant rules to the rights
//! graph held by a [`takegrant_store::Store`].
//!
//! ## Overview
//!
//! - **Owner seeding**: a new object's owner receives read, write and take,
//!   atomically with the object row.
//! - **Grant**: a holder of a right copies it to any other principal.
//! - **Take**: a holder of take on an object copies any right another
//!   principal holds on it.
//! - **Check**: a pure existence test on one edge.
//!
//! Rights are copied, never moved, and never removed by the engine.
//! Precondition failures come back as [`Decision::Denied`] values, while
//! store faults are [`PermsError`]s, so callers can tell a refusal from a
//! failure.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use takegrant_core::{ObjectId, PrincipalId, RightKind};
//! use takegrant_perms::Engine;
//! use takegrant_store::SqliteStore;
//!
//! async fn example() -> takegrant_perms::Result<()> {
//!     let engine = Engine::new(Arc::new(SqliteStore::open_memory()?));
//!     let decision = engine
//!         .grant(PrincipalId(1), PrincipalId(2), ObjectId(1), RightKind::Read)
//!         .await?;
//!     println!("granted: {}", decision.is_success());
//!     Ok(())
//! }
//! ```

pub mod decision;
pub mod engine;
pub mod error;

pub use decision::{Decision, Denial};
pub use engine::Engine;
pub use error::{PermsError, Result};

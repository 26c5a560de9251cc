//! # Takegrant Core
//!
//! Pure data model for a Take-Grant style discretionary access control
//! system: principals, objects, the rights graph, and audit values.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! the authorization graph.
//!
//! ## Key Types
//!
//! - [`Right`] - One (subject, object, kind) edge
//! - [`RightKind`] - `read`, `write` or `take`
//! - [`RightsGraph`] - The edge set, with duplicate-free insertion and cascades
//! - [`AuditEntry`] / [`AuditRecord`] - What the audit trail stores
//! - [`Actor`] - Authenticated principal or merely claimed name

pub mod audit;
pub mod error;
pub mod graph;
pub mod right;
pub mod types;

pub use audit::{Actor, AuditAction, AuditEntry, AuditRecord, Outcome, ANONYMOUS};
pub use error::{CoreError, Result};
pub use graph::{has_duplicate_edges, GuardedInsert, RightsGraph};
pub use right::{Right, RightKind};
pub use types::{AuditId, NewObject, Object, ObjectId, Principal, PrincipalId};

//! Store and audit sink traits: the abstract persistence interface.
//!
//! These traits allow the engine to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use takegrant_core::{
    AuditEntry, AuditId, AuditRecord, GuardedInsert, NewObject, Object, ObjectId, Principal,
    PrincipalId, Right, RightKind,
};

use crate::error::Result;

/// Result of inserting an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Edge was inserted.
    Inserted,
    /// Edge already exists (idempotent - not an error).
    AlreadyExists,
}

/// Stored password material for a principal.
///
/// The store treats the hash as opaque text; hashing happens above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub hash: String,
}

/// Parameters for registering a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub username: String,
    pub credentials: Credentials,
    /// Grant admin if no other principal exists yet, decided in the same
    /// transaction as the insert.
    pub admin_if_first: bool,
}

/// The Store trait: async interface for principals, objects and rights.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic check-and-insert**: every edge insert is a single step that
///   cannot produce a duplicate, even under concurrent callers.
/// - **Idempotent inserts**: inserting an existing edge returns `AlreadyExists`.
/// - **Referential integrity**: inserting an edge whose subject or object does
///   not exist fails with `StoreError::NotFound`; no dangling edges.
/// - **Cascades**: deleting an object or a principal removes its edges in the
///   same transaction.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Principal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a principal.
    ///
    /// Returns `None` if the username is taken.
    async fn insert_principal(&self, new: &NewPrincipal) -> Result<Option<Principal>>;

    /// Get a principal by ID.
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// Get a principal by username.
    async fn get_principal_by_name(&self, username: &str) -> Result<Option<Principal>>;

    /// Get a principal together with its stored credentials.
    async fn get_credentials(&self, username: &str) -> Result<Option<(Principal, Credentials)>>;

    /// List all principals, ordered by ID.
    async fn list_principals(&self) -> Result<Vec<Principal>>;

    /// Set or clear the admin flag. Returns `false` if the principal does not exist.
    async fn set_admin(&self, id: PrincipalId, is_admin: bool) -> Result<bool>;

    /// Delete a principal and every edge where it is the subject.
    ///
    /// Objects it owns are kept. Returns `false` if it did not exist.
    async fn delete_principal(&self, id: PrincipalId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Object Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an object and seed its owner's edges in one transaction.
    ///
    /// Either the object row and every `(owner, object, kind)` edge for
    /// `owner_kinds` are written, or nothing is. Returns `None` if the name
    /// is taken.
    async fn create_object(
        &self,
        new: &NewObject,
        owner_kinds: &[RightKind],
    ) -> Result<Option<Object>>;

    /// Get an object by ID.
    async fn get_object(&self, id: ObjectId) -> Result<Option<Object>>;

    /// Get an object by name.
    async fn get_object_by_name(&self, name: &str) -> Result<Option<Object>>;

    /// List all objects, ordered by ID.
    async fn list_objects(&self) -> Result<Vec<Object>>;

    /// Replace an object's content. Returns `false` if it does not exist.
    async fn update_object_content(&self, id: ObjectId, content: &str) -> Result<bool>;

    /// Delete an object and every edge on it. Returns `false` if it did not exist.
    async fn delete_object(&self, id: ObjectId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Rights Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether an edge exists.
    async fn has_right(&self, edge: &Right) -> Result<bool>;

    /// Insert an edge if absent, atomically.
    async fn insert_right(&self, edge: &Right) -> Result<InsertResult>;

    /// Insert several edges in one transaction: all present afterwards, or
    /// none written.
    async fn insert_rights(&self, edges: &[Right]) -> Result<Vec<InsertResult>>;

    /// Insert `edge` only if every edge in `guards` exists, as one atomic step.
    async fn insert_right_guarded(&self, guards: &[Right], edge: &Right) -> Result<GuardedInsert>;

    /// All edges on an object.
    async fn rights_for_object(&self, object: ObjectId) -> Result<Vec<Right>>;

    /// All edges held by a subject.
    async fn rights_for_subject(&self, subject: PrincipalId) -> Result<Vec<Right>>;

    /// Every edge in the graph.
    async fn all_rights(&self) -> Result<Vec<Right>>;
}

/// Append-only sink for audit records.
///
/// The sink trusts `entry.actor` as given. It performs no verification that
/// the actor is who it claims to be.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append a record. Returns its position in the trail.
    async fn record(&self, entry: &AuditEntry) -> Result<AuditId>;

    /// The most recent `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>>;

    /// Every record, oldest first.
    async fn all_records(&self) -> Result<Vec<AuditRecord>>;
}

/// Extension trait for common store patterns.
#[async_trait]
pub trait StoreExt: Store {
    /// Look up an object's name for audit purposes.
    async fn object_name(&self, id: ObjectId) -> Result<Option<String>> {
        Ok(self.get_object(id).await?.map(|o| o.name))
    }

    /// Whether an object exists.
    async fn object_exists(&self, id: ObjectId) -> Result<bool> {
        Ok(self.get_object(id).await?.is_some())
    }

    /// Whether a principal exists.
    async fn principal_exists(&self, id: PrincipalId) -> Result<bool> {
        Ok(self.get_principal(id).await?.is_some())
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

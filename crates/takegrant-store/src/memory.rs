//! In-memory implementation of the Store and AuditSink traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence. Each operation holds
//! the single lock for its whole duration, which gives the same atomicity
//! as the SQLite transactions.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use takegrant_core::{
    AuditEntry, AuditId, AuditRecord, GuardedInsert, NewObject, Object, ObjectId, Principal,
    PrincipalId, Right, RightKind, RightsGraph,
};

use crate::error::{Result, StoreError};
use crate::now_millis;
use crate::traits::{AuditSink, Credentials, InsertResult, NewPrincipal, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Principals with their credentials, indexed by ID.
    principals: BTreeMap<PrincipalId, (Principal, Credentials)>,

    /// Objects indexed by ID.
    objects: BTreeMap<ObjectId, Object>,

    /// The rights graph.
    graph: RightsGraph,

    /// Audit trail in append order.
    audit: Vec<AuditRecord>,

    /// Last issued row ids, never reused (matches AUTOINCREMENT).
    last_principal_id: i64,
    last_object_id: i64,
}

impl MemoryStoreInner {
    /// Reject edges whose subject or object does not exist.
    fn check_references(&self, edge: &Right) -> Result<()> {
        if !self.principals.contains_key(&edge.subject) {
            return Err(StoreError::NotFound(format!("principal {}", edge.subject)));
        }
        if !self.objects.contains_key(&edge.object) {
            return Err(StoreError::NotFound(format!("object {}", edge.object)));
        }
        Ok(())
    }

    fn insert_edge(&mut self, edge: Right) -> Result<InsertResult> {
        self.check_references(&edge)?;
        Ok(if self.graph.insert_edge(edge) {
            InsertResult::Inserted
        } else {
            InsertResult::AlreadyExists
        })
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// A snapshot of the current rights graph.
    pub fn graph(&self) -> Result<RightsGraph> {
        Ok(self.read()?.graph.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_principal(&self, new: &NewPrincipal) -> Result<Option<Principal>> {
        let mut inner = self.write()?;

        if inner
            .principals
            .values()
            .any(|(p, _)| p.username == new.username)
        {
            return Ok(None);
        }

        let is_admin = new.admin_if_first && inner.principals.is_empty();
        inner.last_principal_id += 1;
        let principal = Principal {
            id: PrincipalId(inner.last_principal_id),
            username: new.username.clone(),
            is_admin,
        };
        inner
            .principals
            .insert(principal.id, (principal.clone(), new.credentials.clone()));

        Ok(Some(principal))
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.read()?.principals.get(&id).map(|(p, _)| p.clone()))
    }

    async fn get_principal_by_name(&self, username: &str) -> Result<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|(p, _)| p.username == username)
            .map(|(p, _)| p.clone()))
    }

    async fn get_credentials(&self, username: &str) -> Result<Option<(Principal, Credentials)>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|(p, _)| p.username == username)
            .cloned())
    }

    async fn list_principals(&self) -> Result<Vec<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn set_admin(&self, id: PrincipalId, is_admin: bool) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.principals.get_mut(&id) {
            Some((p, _)) => {
                p.is_admin = is_admin;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.principals.remove(&id).is_none() {
            return Ok(false);
        }
        inner.graph.remove_subject(id);
        Ok(true)
    }

    async fn create_object(
        &self,
        new: &NewObject,
        owner_kinds: &[RightKind],
    ) -> Result<Option<Object>> {
        let mut inner = self.write()?;

        if inner.objects.values().any(|o| o.name == new.name) {
            return Ok(None);
        }
        // Checked before anything is written, so failure leaves no trace.
        if !inner.principals.contains_key(&new.owner) {
            return Err(StoreError::NotFound(format!("principal {}", new.owner)));
        }

        inner.last_object_id += 1;
        let object = Object {
            id: ObjectId(inner.last_object_id),
            name: new.name.clone(),
            owner: new.owner,
            content: new.content.clone(),
        };
        inner.objects.insert(object.id, object.clone());
        for kind in owner_kinds {
            inner.graph.insert_edge(Right::new(new.owner, object.id, *kind));
        }

        Ok(Some(object))
    }

    async fn get_object(&self, id: ObjectId) -> Result<Option<Object>> {
        Ok(self.read()?.objects.get(&id).cloned())
    }

    async fn get_object_by_name(&self, name: &str) -> Result<Option<Object>> {
        Ok(self
            .read()?
            .objects
            .values()
            .find(|o| o.name == name)
            .cloned())
    }

    async fn list_objects(&self) -> Result<Vec<Object>> {
        Ok(self.read()?.objects.values().cloned().collect())
    }

    async fn update_object_content(&self, id: ObjectId, content: &str) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.objects.get_mut(&id) {
            Some(object) => {
                object.content = content.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_object(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.objects.remove(&id).is_none() {
            return Ok(false);
        }
        inner.graph.remove_object(id);
        Ok(true)
    }

    async fn has_right(&self, edge: &Right) -> Result<bool> {
        Ok(self.read()?.graph.contains(edge))
    }

    async fn insert_right(&self, edge: &Right) -> Result<InsertResult> {
        self.write()?.insert_edge(*edge)
    }

    async fn insert_rights(&self, edges: &[Right]) -> Result<Vec<InsertResult>> {
        let mut inner = self.write()?;

        // Validate everything first so a bad edge leaves the graph untouched.
        for edge in edges {
            inner.check_references(edge)?;
        }
        edges.iter().map(|edge| inner.insert_edge(*edge)).collect()
    }

    async fn insert_right_guarded(&self, guards: &[Right], edge: &Right) -> Result<GuardedInsert> {
        let mut inner = self.write()?;

        if let Some(index) = guards.iter().position(|g| !inner.graph.contains(g)) {
            return Ok(GuardedInsert::MissingGuard(index));
        }
        inner.check_references(edge)?;
        Ok(inner.graph.insert_guarded(guards, *edge))
    }

    async fn rights_for_object(&self, object: ObjectId) -> Result<Vec<Right>> {
        Ok(self.read()?.graph.edges_for_object(object))
    }

    async fn rights_for_subject(&self, subject: PrincipalId) -> Result<Vec<Right>> {
        Ok(self.read()?.graph.edges_for_subject(subject))
    }

    async fn all_rights(&self) -> Result<Vec<Right>> {
        Ok(self.read()?.graph.iter().copied().collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, entry: &AuditEntry) -> Result<AuditId> {
        let mut inner = self.write()?;
        let id = AuditId(inner.audit.len() as i64 + 1);

        inner.audit.push(AuditRecord {
            id,
            timestamp: now_millis(),
            actor: entry.actor.name().to_string(),
            action: entry.action.clone(),
            outcome: entry.outcome,
            target_principal: entry.target_principal,
            object_name: entry.object_name.clone(),
        });

        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(self
            .read()?
            .audit
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_records(&self) -> Result<Vec<AuditRecord>> {
        Ok(self.read()?.audit.clone())
    }
}

//! The authorization engine.
//!
//! Every mutation is delegated to a single guarded insert in the store, so
//! the precondition check and the edge insert happen in one transaction.

use std::str::FromStr;
use std::sync::Arc;

use takegrant_core::{GuardedInsert, NewObject, Object, ObjectId, PrincipalId, Right, RightKind};
use takegrant_store::{InsertResult, Store, StoreError, StoreExt};

use crate::decision::{Decision, Denial};
use crate::error::{PermsError, Result};

/// Applies the Take-Grant rules to a store.
pub struct Engine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> Engine<S> {
    /// Create an engine over a shared store handle.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Give `owner` read, write and take on `object`.
    ///
    /// All three edges are written in one transaction; edges the owner
    /// already holds are left alone.
    pub async fn initialize_owner_rights(&self, owner: PrincipalId, object: ObjectId) -> Result<()> {
        if self.store.get_object(object).await?.is_none() {
            return Err(PermsError::NotFound(format!("object {}", object)));
        }

        let results = self
            .store
            .insert_rights(&Right::owner_seed(owner, object))
            .await?;
        let inserted = results
            .iter()
            .filter(|r| **r == InsertResult::Inserted)
            .count();

        tracing::info!(%owner, %object, inserted, "seeded owner rights");
        Ok(())
    }

    /// Create an object owned by `owner` together with its owner rights.
    ///
    /// Returns `None` if the name is taken.
    pub async fn create_owned_object(
        &self,
        owner: PrincipalId,
        name: &str,
        content: &str,
    ) -> Result<Option<Object>> {
        let created = self
            .store
            .create_object(&NewObject::new(name, content, owner), &RightKind::OWNER_SEED)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => PermsError::NotFound(format!("principal {}", owner)),
                other => PermsError::Store(other),
            })?;

        if let Some(ref object) = created {
            tracing::info!(%owner, object = %object.id, name, "created object");
        }
        Ok(created)
    }

    /// Copy `granter`'s `kind` right on `object` to `grantee`.
    ///
    /// Any holder of a right may grant it to anyone; no edge between
    /// granter and grantee is required. A missing object or grantee is
    /// `NotFound`; a granter without the right is refused.
    pub async fn grant(
        &self,
        granter: PrincipalId,
        grantee: PrincipalId,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<Decision> {
        self.require_object(object).await?;
        if !self.store.principal_exists(grantee).await? {
            return Err(PermsError::NotFound(format!("principal {}", grantee)));
        }

        let source = Right::new(granter, object, kind);
        let edge = source.copied_to(grantee);
        let decision = match self.guarded(&[source], &edge).await? {
            GuardedInsert::MissingGuard(_) => Decision::Denied(Denial::Unauthorized),
            other => applied(other),
        };

        tracing::debug!(%granter, %grantee, %object, %kind, ?decision, "grant");
        Ok(decision)
    }

    /// Copy `target`'s `kind` right on `object` to `taker`.
    ///
    /// Requires `taker` to hold take on the object and `target` to hold `kind`.
    /// A missing object is `NotFound`. A missing taker or target holds
    /// nothing, so it is refused like any principal without the right.
    pub async fn take(
        &self,
        taker: PrincipalId,
        target: PrincipalId,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<Decision> {
        self.require_object(object).await?;
        let guards = [
            Right::new(taker, object, RightKind::Take),
            Right::new(target, object, kind),
        ];
        let edge = guards[1].copied_to(taker);

        let decision = match self.guarded(&guards, &edge).await? {
            GuardedInsert::MissingGuard(0) => Decision::Denied(Denial::Unauthorized),
            GuardedInsert::MissingGuard(_) => Decision::Denied(Denial::RightNotHeld),
            other => applied(other),
        };

        tracing::debug!(%taker, %target, %object, %kind, ?decision, "take");
        Ok(decision)
    }

    /// Whether `subject` holds `kind` on `object`.
    pub async fn check(
        &self,
        subject: PrincipalId,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<bool> {
        Ok(self
            .store
            .has_right(&Right::new(subject, object, kind))
            .await?)
    }

    /// [`Engine::grant`] with the kind given as text.
    ///
    /// Nobody can hold an unknown kind, so it is refused as unauthorized.
    pub async fn grant_named(
        &self,
        granter: PrincipalId,
        grantee: PrincipalId,
        object: ObjectId,
        kind: &str,
    ) -> Result<Decision> {
        match RightKind::from_str(kind) {
            Ok(kind) => self.grant(granter, grantee, object, kind).await,
            Err(_) => Ok(Decision::Denied(Denial::Unauthorized)),
        }
    }

    /// [`Engine::take`] with the kind given as text.
    ///
    /// The target cannot hold an unknown kind, so it is refused as not held.
    pub async fn take_named(
        &self,
        taker: PrincipalId,
        target: PrincipalId,
        object: ObjectId,
        kind: &str,
    ) -> Result<Decision> {
        match RightKind::from_str(kind) {
            Ok(kind) => self.take(taker, target, object, kind).await,
            Err(_) => Ok(Decision::Denied(Denial::RightNotHeld)),
        }
    }

    async fn require_object(&self, object: ObjectId) -> Result<()> {
        if self.store.object_exists(object).await? {
            Ok(())
        } else {
            Err(PermsError::NotFound(format!("object {}", object)))
        }
    }

    async fn guarded(&self, guards: &[Right], edge: &Right) -> Result<GuardedInsert> {
        match self.store.insert_right_guarded(guards, edge).await {
            Ok(result) => Ok(result),
            // A racing insert of the same edge counts as done if the edge is there.
            Err(StoreError::Conflict(msg)) => {
                if self.store.has_right(edge).await? {
                    Ok(GuardedInsert::AlreadyExists)
                } else {
                    Err(PermsError::Conflict(msg))
                }
            }
            Err(StoreError::NotFound(msg)) => Err(PermsError::NotFound(msg)),
            Err(e) => Err(e.into()),
        }
    }
}

fn applied(result: GuardedInsert) -> Decision {
    match result {
        GuardedInsert::Inserted => Decision::Applied,
        _ => Decision::AlreadyHeld,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use takegrant_store::{Credentials, MemoryStore, NewPrincipal, SqliteStore};

    async fn principal<S: Store>(store: &S, name: &str) -> PrincipalId {
        store
            .insert_principal(&NewPrincipal {
                username: name.into(),
                credentials: Credentials {
                    hash: String::new(),
                },
                admin_if_first: true,
            })
            .await
            .unwrap()
            .unwrap()
            .id
    }

    async fn setup<S: Store>(store: S) -> (Engine<S>, PrincipalId, PrincipalId, ObjectId) {
        let u1 = principal(&store, "user1").await;
        let u2 = principal(&store, "user2").await;
        let engine = Engine::new(Arc::new(store));
        let file1 = engine
            .create_owned_object(u1, "file1", "secret")
            .await
            .unwrap()
            .unwrap();
        (engine, u1, u2, file1.id)
    }

    #[tokio::test]
    async fn test_owner_seeded_on_create() {
        let (engine, u1, u2, obj) = setup(MemoryStore::new()).await;
        for kind in RightKind::ALL {
            assert!(engine.check(u1, obj, kind).await.unwrap());
            assert!(!engine.check(u2, obj, kind).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_initialize_owner_rights_is_idempotent() {
        let (engine, u1, _, obj) = setup(SqliteStore::open_memory().unwrap()).await;
        engine.initialize_owner_rights(u1, obj).await.unwrap();
        assert_eq!(engine.store().rights_for_object(obj).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_initialize_owner_rights_missing_object() {
        let (engine, u1, _, _) = setup(MemoryStore::new()).await;
        let err = engine
            .initialize_owner_rights(u1, ObjectId(99))
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_grant_copies_right() {
        let (engine, u1, u2, obj) = setup(MemoryStore::new()).await;

        let d = engine.grant(u1, u2, obj, RightKind::Read).await.unwrap();
        assert_eq!(d, Decision::Applied);
        assert!(engine.check(u2, obj, RightKind::Read).await.unwrap());
        assert!(engine.check(u1, obj, RightKind::Read).await.unwrap());

        let again = engine.grant(u1, u2, obj, RightKind::Read).await.unwrap();
        assert_eq!(again, Decision::AlreadyHeld);
    }

    #[tokio::test]
    async fn test_grant_requires_held_right() {
        let (engine, u1, u2, obj) = setup(MemoryStore::new()).await;

        let d = engine.grant(u2, u1, obj, RightKind::Write).await.unwrap();
        assert_eq!(d, Decision::Denied(Denial::Unauthorized));
    }

    #[tokio::test]
    async fn test_grant_to_missing_principal() {
        let (engine, u1, _, obj) = setup(SqliteStore::open_memory().unwrap()).await;
        let err = engine
            .grant(u1, PrincipalId(404), obj, RightKind::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (engine, u1, u2, _) = setup(SqliteStore::open_memory().unwrap()).await;
        let missing = ObjectId(99);

        let err = engine.grant(u1, u2, missing, RightKind::Read).await.unwrap_err();
        assert!(matches!(err, PermsError::NotFound(ref m) if m == "object 99"));

        let err = engine.take(u2, u1, missing, RightKind::Read).await.unwrap_err();
        assert!(matches!(err, PermsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_take_preconditions() {
        let (engine, u1, u2, obj) = setup(SqliteStore::open_memory().unwrap()).await;

        // No take right yet.
        let d = engine.take(u2, u1, obj, RightKind::Write).await.unwrap();
        assert_eq!(d, Decision::Denied(Denial::Unauthorized));

        engine.grant(u1, u2, obj, RightKind::Take).await.unwrap();
        let d = engine.take(u2, u1, obj, RightKind::Write).await.unwrap();
        assert_eq!(d, Decision::Applied);
        assert!(engine.check(u1, obj, RightKind::Write).await.unwrap());

        let d = engine.take_named(u2, u1, obj, "execute").await.unwrap();
        assert_eq!(d, Decision::Denied(Denial::RightNotHeld));
    }

    #[tokio::test]
    async fn test_take_from_target_without_right() {
        let (engine, u1, u2, obj) = setup(MemoryStore::new()).await;
        engine.grant(u1, u2, obj, RightKind::Take).await.unwrap();

        // u1 takes from u2, who holds take but not write.
        let d = engine.take(u1, u2, obj, RightKind::Write).await.unwrap();
        assert_eq!(d, Decision::Denied(Denial::RightNotHeld));
    }

    #[tokio::test]
    async fn test_grant_named_unknown_kind() {
        let (engine, u1, u2, obj) = setup(MemoryStore::new()).await;
        let d = engine.grant_named(u1, u2, obj, "execute").await.unwrap();
        assert_eq!(d, Decision::Denied(Denial::Unauthorized));

        let d = engine.grant_named(u1, u2, obj, "READ").await.unwrap();
        assert_eq!(d, Decision::Applied);
    }

    #[tokio::test]
    async fn test_create_owned_object_missing_owner() {
        let engine = Engine::new(Arc::new(MemoryStore::new()));
        let err = engine
            .create_owned_object(PrincipalId(1), "x", "")
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::NotFound(_)));
    }
}

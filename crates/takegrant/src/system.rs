//! The System: identity, object lifecycle and audited rights operations.
//!
//! Every command except `show_audit` and `whoami` writes exactly one audit
//! record, including refused and failed ones. The audit write happens after
//! the mutation and is not part of its transaction: if it fails, the
//! mutation stands and the failure is handed back in
//! [`Audited::audit_warning`], or in [`SystemError::Unaudited`] when the
//! command itself failed.

use std::sync::Arc;

use takegrant_core::{
    Actor, AuditAction, AuditEntry, AuditRecord, CoreError, Object, ObjectId, Outcome, Principal,
    PrincipalId, RightKind,
};
use takegrant_perms::{Decision, Engine, PermsError};
use takegrant_store::{AuditSink, NewPrincipal, SqliteStore, Store, StoreError, StoreExt};

use crate::config::SystemConfig;
use crate::error::{Result, SystemError};
use crate::identity;

/// A logged-in principal.
///
/// Only [`System::login`] creates sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    principal: Principal,
}

impl Session {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn id(&self) -> PrincipalId {
        self.principal.id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    fn actor(&self) -> Actor {
        Actor::Authenticated(self.principal.clone())
    }
}

/// A command result together with the fate of its audit record.
#[derive(Debug)]
pub struct Audited<T> {
    pub value: T,
    /// Set when the audit record could not be written.
    pub audit_warning: Option<StoreError>,
}

impl<T> Audited<T> {
    /// Whether the audit record was written.
    pub fn is_recorded(&self) -> bool {
        self.audit_warning.is_none()
    }

    /// Discard the audit status.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Result of a content operation guarded by a right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access<T> {
    Granted(T),
    Denied,
}

impl<T> Access<T> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted(_))
    }

    pub fn granted(self) -> Option<T> {
        match self {
            Access::Granted(v) => Some(v),
            Access::Denied => None,
        }
    }
}

/// The main System struct.
///
/// Brings together the store, the authorization engine and the audit sink.
pub struct System<S: Store> {
    engine: Engine<S>,
    audit: Arc<dyn AuditSink>,
    config: SystemConfig,
}

impl System<SqliteStore> {
    /// Open the SQLite-backed system described by `config`.
    pub fn open(config: SystemConfig) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open_with(path, &config.store_config())?,
            None => SqliteStore::open_memory()?,
        };
        tracing::debug!(path = ?config.database_path, "opened store");
        Ok(Self::new(store, config))
    }
}

impl<S: Store + AuditSink + 'static> System<S> {
    /// Create a system whose store is also its audit sink.
    pub fn new(store: S, config: SystemConfig) -> Self {
        let store = Arc::new(store);
        let audit: Arc<dyn AuditSink> = store.clone();
        Self::with_audit_sink(store, audit, config)
    }
}

impl<S: Store> System<S> {
    /// Create a system with a separate audit sink.
    pub fn with_audit_sink(store: Arc<S>, audit: Arc<dyn AuditSink>, config: SystemConfig) -> Self {
        Self {
            engine: Engine::new(store),
            audit,
            config,
        }
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        self.engine.store()
    }

    pub fn audit_sink(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a principal.
    pub async fn register(&self, username: &str, password: &str) -> Result<Audited<Principal>> {
        let username = username.trim();
        let entry = |outcome| AuditEntry::new(Actor::claimed(username), AuditAction::Register, outcome);

        if username.is_empty() {
            let err = CoreError::InvalidName("username must not be empty".into());
            return self.refuse(entry(Outcome::Fail), err.into()).await;
        }

        let credentials = match identity::hash_password(password, self.config.password_cost).await {
            Ok(credentials) => credentials,
            Err(e) => return self.refuse(entry(Outcome::Fail), e).await,
        };
        let new = NewPrincipal {
            username: username.to_string(),
            credentials,
            admin_if_first: self.config.first_user_is_admin,
        };
        match self.store().insert_principal(&new).await {
            Ok(Some(principal)) => {
                tracing::info!(id = %principal.id, username, admin = principal.is_admin, "registered");
                Ok(self.audited(principal, entry(Outcome::Success)).await)
            }
            Ok(None) => {
                let err = SystemError::UsernameTaken(username.to_string());
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Verify credentials and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Audited<Session>> {
        let username = username.trim();
        let found = match self.store().get_credentials(username).await {
            Ok(found) => found,
            Err(e) => {
                let entry = AuditEntry::new(Actor::claimed(username), AuditAction::Login, Outcome::Fail);
                return self.refuse(entry, e.into()).await;
            }
        };

        if let Some((principal, credentials)) = found {
            if identity::verify_password(password, &credentials).await {
                let session = Session { principal };
                let entry = AuditEntry::new(session.actor(), AuditAction::Login, Outcome::Success);
                return Ok(self.audited(session, entry).await);
            }
        }

        let entry = AuditEntry::new(Actor::claimed(username), AuditAction::Login, Outcome::Fail);
        self.refuse(entry, SystemError::InvalidCredentials).await
    }

    /// Close a session.
    pub async fn logout(&self, session: Session) -> Audited<()> {
        let entry = AuditEntry::new(session.actor(), AuditAction::Logout, Outcome::Success);
        self.audited((), entry).await
    }

    /// The current state of the session's principal, if it still exists.
    pub async fn whoami(&self, session: &Session) -> Result<Option<Principal>> {
        Ok(self.store().get_principal(session.id()).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Objects
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an object owned by the session's principal.
    ///
    /// The owner receives read, write and take in the same transaction.
    pub async fn create_object(
        &self,
        session: Option<&Session>,
        name: &str,
        content: &str,
    ) -> Result<Audited<Object>> {
        let session = self.require_session(session, "create_object").await?;
        let name = name.trim();
        let entry = |outcome| {
            AuditEntry::new(
                session.actor(),
                AuditAction::CreateObject {
                    name: name.to_string(),
                },
                outcome,
            )
            .with_object_name(Some(name.to_string()))
        };

        if name.is_empty() {
            let err = CoreError::InvalidName("object name must not be empty".into());
            return self.refuse(entry(Outcome::Fail), err.into()).await;
        }

        match self
            .engine
            .create_owned_object(session.id(), name, content)
            .await
        {
            Ok(Some(object)) => Ok(self.audited(object, entry(Outcome::Success)).await),
            Ok(None) => {
                let err = SystemError::ObjectNameTaken(name.to_string());
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), lift(e)).await,
        }
    }

    /// List every object. Open to anyone, including anonymous callers.
    pub async fn list_objects(&self, session: Option<&Session>) -> Result<Audited<Vec<Object>>> {
        let entry = |outcome| AuditEntry::new(actor_of(session), AuditAction::ListObjects, outcome);
        match self.store().list_objects().await {
            Ok(objects) => Ok(self.audited(objects, entry(Outcome::Success)).await),
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Read an object's content. Requires read.
    pub async fn read_object(
        &self,
        session: Option<&Session>,
        object: ObjectId,
    ) -> Result<Audited<Access<Object>>> {
        let object_name = self.object_name(object).await;
        let entry = |outcome| {
            AuditEntry::new(actor_of(session), AuditAction::ReadObject { object }, outcome)
                .with_object_name(object_name.clone())
        };

        match self.allowed(session, object, RightKind::Read).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.audited(Access::Denied, entry(Outcome::Denied)).await),
            Err(e) => return self.refuse(entry(Outcome::Fail), e).await,
        }

        match self.store().get_object(object).await {
            Ok(Some(found)) => Ok(self
                .audited(Access::Granted(found), entry(Outcome::Success))
                .await),
            Ok(None) => {
                let err = SystemError::NotFound(format!("object {}", object));
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Replace an object's content. Requires write.
    pub async fn write_object(
        &self,
        session: Option<&Session>,
        object: ObjectId,
        content: &str,
    ) -> Result<Audited<Access<()>>> {
        let object_name = self.object_name(object).await;
        let entry = |outcome| {
            AuditEntry::new(actor_of(session), AuditAction::WriteObject { object }, outcome)
                .with_object_name(object_name.clone())
        };

        match self.allowed(session, object, RightKind::Write).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.audited(Access::Denied, entry(Outcome::Denied)).await),
            Err(e) => return self.refuse(entry(Outcome::Fail), e).await,
        }

        match self.store().update_object_content(object, content).await {
            Ok(true) => Ok(self.audited(Access::Granted(()), entry(Outcome::Success)).await),
            Ok(false) => {
                let err = SystemError::NotFound(format!("object {}", object));
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Delete an object and every right on it. Requires write.
    pub async fn delete_object(
        &self,
        session: Option<&Session>,
        object: ObjectId,
    ) -> Result<Audited<Access<()>>> {
        let object_name = self.object_name(object).await;
        let entry = |outcome| {
            AuditEntry::new(actor_of(session), AuditAction::DeleteObject { object }, outcome)
                .with_object_name(object_name.clone())
        };

        match self.allowed(session, object, RightKind::Write).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.audited(Access::Denied, entry(Outcome::Denied)).await),
            Err(e) => return self.refuse(entry(Outcome::Fail), e).await,
        }

        match self.store().delete_object(object).await {
            Ok(true) => {
                tracing::info!(%object, "deleted object");
                Ok(self.audited(Access::Granted(()), entry(Outcome::Success)).await)
            }
            Ok(false) => {
                let err = SystemError::NotFound(format!("object {}", object));
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rights
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant one of the session's rights on `object` to `grantee`.
    ///
    /// A refused grant is audited as `fail`.
    pub async fn grant(
        &self,
        session: Option<&Session>,
        grantee: PrincipalId,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<Audited<Decision>> {
        let session = self.require_session(session, "grant").await?;
        let action = AuditAction::Grant {
            kind,
            object,
            grantee,
        };
        let result = self.engine.grant(session.id(), grantee, object, kind).await;
        self.settle(session.actor(), action, grantee, object, result)
            .await
    }

    /// Take `target`'s `kind` right on `object` for the session's principal.
    ///
    /// A refused take is audited as `fail`.
    pub async fn take(
        &self,
        session: Option<&Session>,
        target: PrincipalId,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<Audited<Decision>> {
        let session = self.require_session(session, "take").await?;
        let action = AuditAction::Take {
            kind,
            object,
            target,
        };
        let result = self.engine.take(session.id(), target, object, kind).await;
        self.settle(session.actor(), action, target, object, result)
            .await
    }

    /// [`System::grant`] with the kind given as text.
    pub async fn grant_named(
        &self,
        session: Option<&Session>,
        grantee: PrincipalId,
        object: ObjectId,
        kind: &str,
    ) -> Result<Audited<Decision>> {
        match kind.parse::<RightKind>() {
            Ok(kind) => self.grant(session, grantee, object, kind).await,
            Err(e) => {
                let session = self.require_session(session, "grant").await?;
                let result = self
                    .engine
                    .grant_named(session.id(), grantee, object, kind)
                    .await;
                self.rejected_kind(session, "grant", e, grantee, object, result)
                    .await
            }
        }
    }

    /// [`System::take`] with the kind given as text.
    pub async fn take_named(
        &self,
        session: Option<&Session>,
        target: PrincipalId,
        object: ObjectId,
        kind: &str,
    ) -> Result<Audited<Decision>> {
        match kind.parse::<RightKind>() {
            Ok(kind) => self.take(session, target, object, kind).await,
            Err(e) => {
                let session = self.require_session(session, "take").await?;
                let result = self
                    .engine
                    .take_named(session.id(), target, object, kind)
                    .await;
                self.rejected_kind(session, "take", e, target, object, result)
                    .await
            }
        }
    }

    /// Whether the session's principal holds `kind` on `object`.
    ///
    /// A negative answer is audited as `denied`.
    pub async fn check(
        &self,
        session: Option<&Session>,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<Audited<bool>> {
        let session = self.require_session(session, "check").await?;
        let object_name = self.object_name(object).await;
        let entry = |outcome| {
            AuditEntry::new(session.actor(), AuditAction::Check { kind, object }, outcome)
                .with_object_name(object_name.clone())
        };

        match self.engine.check(session.id(), object, kind).await {
            Ok(true) => Ok(self.audited(true, entry(Outcome::Success)).await),
            Ok(false) => Ok(self.audited(false, entry(Outcome::Denied)).await),
            Err(e) => self.refuse(entry(Outcome::Fail), lift(e)).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────────────────────

    /// List every principal. Admin only.
    pub async fn list_users(&self, session: Option<&Session>) -> Result<Audited<Vec<Principal>>> {
        let session = self.require_admin(session, AuditAction::ListUsers).await?;
        let entry = |outcome| AuditEntry::new(session.actor(), AuditAction::ListUsers, outcome);

        match self.store().list_principals().await {
            Ok(users) => Ok(self.audited(users, entry(Outcome::Success)).await),
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Delete a principal and every right it holds. Admin only.
    ///
    /// Objects the principal owns are kept.
    pub async fn delete_user(
        &self,
        session: Option<&Session>,
        principal: PrincipalId,
    ) -> Result<Audited<()>> {
        let action = AuditAction::DeleteUser { principal };
        let session = self.require_admin(session, action.clone()).await?;
        let entry =
            |outcome| AuditEntry::new(session.actor(), action.clone(), outcome).with_target(principal);

        match self.store().delete_principal(principal).await {
            Ok(true) => {
                tracing::info!(%principal, by = session.username(), "deleted user");
                Ok(self.audited((), entry(Outcome::Success)).await)
            }
            Ok(false) => {
                let err = SystemError::NotFound(format!("principal {}", principal));
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// Make a principal an administrator. Admin only.
    pub async fn make_admin(
        &self,
        session: Option<&Session>,
        principal: PrincipalId,
    ) -> Result<Audited<()>> {
        let action = AuditAction::MakeAdmin { principal };
        let session = self.require_admin(session, action.clone()).await?;
        let entry =
            |outcome| AuditEntry::new(session.actor(), action.clone(), outcome).with_target(principal);

        match self.store().set_admin(principal, true).await {
            Ok(true) => {
                tracing::info!(%principal, by = session.username(), "granted admin");
                Ok(self.audited((), entry(Outcome::Success)).await)
            }
            Ok(false) => {
                let err = SystemError::NotFound(format!("principal {}", principal));
                self.refuse(entry(Outcome::Fail), err).await
            }
            Err(e) => self.refuse(entry(Outcome::Fail), e.into()).await,
        }
    }

    /// The most recent audit records, newest first.
    ///
    /// Defaults to [`SystemConfig::audit_page_size`] records.
    pub async fn show_audit(&self, limit: Option<usize>) -> Result<Vec<AuditRecord>> {
        let limit = limit.unwrap_or(self.config.audit_page_size);
        Ok(self.audit.recent(limit).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an audit record, reporting a failed write instead of raising it.
    pub(crate) async fn record(&self, entry: AuditEntry) -> Option<StoreError> {
        match self.audit.record(&entry).await {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    actor = %entry.actor,
                    action = %entry.action,
                    outcome = %entry.outcome,
                    error = %e,
                    "audit write failed"
                );
                Some(e)
            }
        }
    }

    pub(crate) async fn audited<T>(&self, value: T, entry: AuditEntry) -> Audited<T> {
        Audited {
            value,
            audit_warning: self.record(entry).await,
        }
    }

    /// Record the refusal, then return `err`.
    ///
    /// A failed audit write is attached as [`SystemError::Unaudited`].
    async fn refuse<T>(&self, entry: AuditEntry, err: SystemError) -> Result<T> {
        match self.record(entry).await {
            None => Err(err),
            Some(audit) => Err(SystemError::Unaudited {
                error: Box::new(err),
                audit,
            }),
        }
    }

    /// Object name for audit records, if the object exists.
    pub(crate) async fn object_name(&self, object: ObjectId) -> Option<String> {
        match self.store().object_name(object).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(%object, error = %e, "object name lookup failed");
                None
            }
        }
    }

    /// Audit a grant or take decision made by the engine.
    pub(crate) async fn settle(
        &self,
        actor: Actor,
        action: AuditAction,
        target: PrincipalId,
        object: ObjectId,
        result: std::result::Result<Decision, PermsError>,
    ) -> Result<Audited<Decision>> {
        let object_name = self.object_name(object).await;
        let entry = |outcome| {
            AuditEntry::new(actor.clone(), action.clone(), outcome)
                .with_target(target)
                .with_object_name(object_name.clone())
        };

        match result {
            Ok(decision) => {
                if let Some(denial) = decision.denial() {
                    tracing::debug!(actor = %actor, action = %action, %denial, "refused");
                }
                Ok(self.audited(decision, entry(decision.outcome())).await)
            }
            Err(e) => self.refuse(entry(Outcome::Fail), lift(e)).await,
        }
    }

    async fn rejected_kind(
        &self,
        session: &Session,
        command: &str,
        err: CoreError,
        target: PrincipalId,
        object: ObjectId,
        result: std::result::Result<Decision, PermsError>,
    ) -> Result<Audited<Decision>> {
        let action = AuditAction::Rejected {
            command: command.to_string(),
            reason: err.to_string(),
        };
        self.settle(session.actor(), action, target, object, result)
            .await
    }

    /// Unwrap the session or record an anonymous refusal.
    async fn require_session<'a>(
        &self,
        session: Option<&'a Session>,
        command: &str,
    ) -> Result<&'a Session> {
        match session {
            Some(session) => Ok(session),
            None => {
                let entry = AuditEntry::new(
                    Actor::anonymous(),
                    AuditAction::Rejected {
                        command: command.to_string(),
                        reason: "not logged in".to_string(),
                    },
                    Outcome::Fail,
                );
                self.refuse(entry, SystemError::NotAuthenticated).await
            }
        }
    }

    /// Unwrap the session if its principal is currently an admin, or record
    /// a denial of `action`.
    async fn require_admin<'a>(
        &self,
        session: Option<&'a Session>,
        action: AuditAction,
    ) -> Result<&'a Session> {
        if let Some(session) = session {
            match self.store().get_principal(session.id()).await {
                Ok(Some(current)) if current.is_admin => return Ok(session),
                Ok(_) => {}
                Err(e) => {
                    let entry = AuditEntry::new(session.actor(), action, Outcome::Fail);
                    return self.refuse(entry, e.into()).await;
                }
            }
        }

        let actor = actor_of(session);
        tracing::warn!(actor = %actor, action = %action, "admin command denied");
        let entry = AuditEntry::new(actor, action, Outcome::Denied);
        self.refuse(entry, SystemError::AdminRequired).await
    }

    /// Whether the caller holds `kind` on `object`. Anonymous callers hold nothing.
    async fn allowed(
        &self,
        session: Option<&Session>,
        object: ObjectId,
        kind: RightKind,
    ) -> Result<bool> {
        match session {
            Some(session) => Ok(self
                .engine
                .check(session.id(), object, kind)
                .await
                .map_err(lift)?),
            None => Ok(false),
        }
    }
}

fn actor_of(session: Option<&Session>) -> Actor {
    session.map_or_else(Actor::anonymous, Session::actor)
}

fn lift(err: PermsError) -> SystemError {
    match err {
        PermsError::NotFound(msg) => SystemError::NotFound(msg),
        other => SystemError::Perms(other),
    }
}

//! SQLite implementation of the Store and AuditSink traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use takegrant_core::{
    AuditAction, AuditEntry, AuditId, AuditRecord, GuardedInsert, NewObject, Object, ObjectId,
    Outcome, Principal, PrincipalId, Right, RightKind,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::now_millis;
use crate::traits::{AuditSink, Credentials, InsertResult, NewPrincipal, Store};

/// Connection settings for [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a writer waits for another connection's lock before the
    /// operation fails with [`StoreError::Busy`].
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Other processes sharing the same
/// database file are serialized by SQLite's own locking, bounded by
/// [`StoreConfig::busy_timeout`].
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path with default settings.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &StoreConfig::default())
    }

    /// Open a SQLite database at the given path.
    pub fn open_with(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        configure(&conn, config)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        migration::migrate(&mut conn).map_err(reclassify)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure(&conn, &StoreConfig::default())?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn).map_err(reclassify)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

/// Turn raw database errors into busy / not-found / conflict where possible.
fn reclassify(err: StoreError) -> StoreError {
    match err {
        StoreError::Database(inner) => {
            let classified = StoreError::classify(inner);
            if classified.is_busy() {
                tracing::warn!(error = %classified, "store lock wait exhausted");
            }
            classified
        }
        other => other,
    }
}

fn conversion_error(column: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

// Helper to convert a row to Principal.
// Expects columns: id, username, is_admin
fn row_to_principal(row: &rusqlite::Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: PrincipalId(row.get("id")?),
        username: row.get("username")?,
        is_admin: row.get::<_, i64>("is_admin")? != 0,
    })
}

// Expects columns: id, name, content, owner_id
fn row_to_object(row: &rusqlite::Row<'_>) -> rusqlite::Result<Object> {
    Ok(Object {
        id: ObjectId(row.get("id")?),
        name: row.get("name")?,
        owner: PrincipalId(row.get("owner_id")?),
        content: row.get("content")?,
    })
}

// Expects columns: subject_id, object_id, kind
fn row_to_right(row: &rusqlite::Row<'_>) -> rusqlite::Result<Right> {
    let kind: String = row.get("kind")?;
    let kind: RightKind = kind.parse().map_err(|e| conversion_error(2, e))?;
    Ok(Right::new(
        PrincipalId(row.get("subject_id")?),
        ObjectId(row.get("object_id")?),
        kind,
    ))
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let action: String = row.get("action")?;
    let action: AuditAction = serde_json::from_str(&action).map_err(|e| conversion_error(3, e))?;
    let outcome: String = row.get("result")?;
    let outcome: Outcome = outcome.parse().map_err(|e| conversion_error(4, e))?;

    Ok(AuditRecord {
        id: AuditId(row.get("id")?),
        timestamp: row.get("timestamp")?,
        actor: row.get("actor")?,
        action,
        outcome,
        target_principal: row.get::<_, Option<i64>>("target_principal_id")?.map(PrincipalId),
        object_name: row.get("object_name")?,
    })
}

fn edge_exists(conn: &Connection, edge: &Right) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM rights WHERE subject_id = ?1 AND object_id = ?2 AND kind = ?3)",
        params![edge.subject.0, edge.object.0, edge.kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert an edge if absent. The uniqueness constraint on the triple makes
/// this a single atomic step.
fn insert_edge(conn: &Connection, edge: &Right, now: i64) -> Result<InsertResult> {
    let changed = conn.execute(
        "INSERT INTO rights (subject_id, object_id, kind, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (subject_id, object_id, kind) DO NOTHING",
        params![edge.subject.0, edge.object.0, edge.kind.as_str(), now],
    )?;
    Ok(if changed == 0 {
        InsertResult::AlreadyExists
    } else {
        InsertResult::Inserted
    })
}

const PRINCIPAL_COLUMNS: &str = "id, username, is_admin";
const OBJECT_COLUMNS: &str = "id, name, content, owner_id";
const AUDIT_COLUMNS: &str =
    "id, timestamp, actor, action, result, target_principal_id, object_name";

#[async_trait]
impl Store for SqliteStore {
    async fn insert_principal(&self, new: &NewPrincipal) -> Result<Option<Principal>> {
        let new = new.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let is_admin = if new.admin_if_first {
                let count: i64 =
                    tx.query_row("SELECT COUNT(*) FROM principals", [], |row| row.get(0))?;
                count == 0
            } else {
                false
            };

            let changed = tx.execute(
                "INSERT INTO principals (username, password_hash, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (username) DO NOTHING",
                params![
                    new.username,
                    new.credentials.hash,
                    is_admin as i64,
                    now_millis(),
                ],
            )?;

            if changed == 0 {
                return Ok(None);
            }

            let id = PrincipalId(tx.last_insert_rowid());
            tx.commit()?;

            Ok(Some(Principal {
                id,
                username: new.username,
                is_admin,
            }))
        })
        .await
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = ?1"),
                params![id.0],
                row_to_principal,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_principal_by_name(&self, username: &str) -> Result<Option<Principal>> {
        let username = username.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE username = ?1"),
                params![username],
                row_to_principal,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_credentials(&self, username: &str) -> Result<Option<(Principal, Credentials)>> {
        let username = username.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, username, is_admin, password_hash
                 FROM principals WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row_to_principal(row)?,
                        Credentials {
                            hash: row.get("password_hash")?,
                        },
                    ))
                },
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_principals(&self) -> Result<Vec<Principal>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {PRINCIPAL_COLUMNS} FROM principals ORDER BY id"))?;
            let principals = stmt
                .query_map([], row_to_principal)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(principals)
        })
        .await
    }

    async fn set_admin(&self, id: PrincipalId, is_admin: bool) -> Result<bool> {
        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE principals SET is_admin = ?1 WHERE id = ?2",
                params![is_admin as i64, id.0],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<bool> {
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let edges = tx.execute("DELETE FROM rights WHERE subject_id = ?1", params![id.0])?;
            let changed = tx.execute("DELETE FROM principals WHERE id = ?1", params![id.0])?;
            tx.commit()?;

            if changed > 0 {
                tracing::debug!(principal = %id, edges, "deleted principal and its edges");
            }
            Ok(changed > 0)
        })
        .await
    }

    async fn create_object(
        &self,
        new: &NewObject,
        owner_kinds: &[RightKind],
    ) -> Result<Option<Object>> {
        let new = new.clone();
        let owner_kinds = owner_kinds.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_millis();

            let changed = tx.execute(
                "INSERT INTO objects (name, content, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (name) DO NOTHING",
                params![new.name, new.content, new.owner.0, now],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let id = ObjectId(tx.last_insert_rowid());

            // Seeding shares the transaction with the object row: an error
            // here drops `tx` and rolls back both.
            for kind in owner_kinds {
                insert_edge(&tx, &Right::new(new.owner, id, kind), now)?;
            }

            tx.commit()?;

            Ok(Some(Object {
                id,
                name: new.name,
                owner: new.owner,
                content: new.content,
            }))
        })
        .await
    }

    async fn get_object(&self, id: ObjectId) -> Result<Option<Object>> {
        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE id = ?1"),
                params![id.0],
                row_to_object,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_object_by_name(&self, name: &str) -> Result<Option<Object>> {
        let name = name.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE name = ?1"),
                params![name],
                row_to_object,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_objects(&self) -> Result<Vec<Object>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {OBJECT_COLUMNS} FROM objects ORDER BY id"))?;
            let objects = stmt
                .query_map([], row_to_object)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(objects)
        })
        .await
    }

    async fn update_object_content(&self, id: ObjectId, content: &str) -> Result<bool> {
        let content = content.to_string();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE objects SET content = ?1 WHERE id = ?2",
                params![content, id.0],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_object(&self, id: ObjectId) -> Result<bool> {
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let edges = tx.execute("DELETE FROM rights WHERE object_id = ?1", params![id.0])?;
            let changed = tx.execute("DELETE FROM objects WHERE id = ?1", params![id.0])?;
            tx.commit()?;

            if changed > 0 {
                tracing::debug!(object = %id, edges, "deleted object and its edges");
            }
            Ok(changed > 0)
        })
        .await
    }

    async fn has_right(&self, edge: &Right) -> Result<bool> {
        let edge = *edge;
        self.blocking(move |conn| edge_exists(conn, &edge)).await
    }

    async fn insert_right(&self, edge: &Right) -> Result<InsertResult> {
        let edge = *edge;
        self.blocking(move |conn| insert_edge(conn, &edge, now_millis()))
            .await
    }

    async fn insert_rights(&self, edges: &[Right]) -> Result<Vec<InsertResult>> {
        let edges = edges.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_millis();

            let results = edges
                .iter()
                .map(|edge| insert_edge(&tx, edge, now))
                .collect::<Result<Vec<_>>>()?;

            tx.commit()?;
            Ok(results)
        })
        .await
    }

    async fn insert_right_guarded(&self, guards: &[Right], edge: &Right) -> Result<GuardedInsert> {
        let guards = guards.to_vec();
        let edge = *edge;

        self.blocking(move |conn| {
            // IMMEDIATE takes the write lock up front, so no other writer can
            // slip in between the guard checks and the insert.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            for (index, guard) in guards.iter().enumerate() {
                if !edge_exists(&tx, guard)? {
                    return Ok(GuardedInsert::MissingGuard(index));
                }
            }

            let result = insert_edge(&tx, &edge, now_millis())?;
            tx.commit()?;

            Ok(match result {
                InsertResult::Inserted => GuardedInsert::Inserted,
                InsertResult::AlreadyExists => GuardedInsert::AlreadyExists,
            })
        })
        .await
    }

    async fn rights_for_object(&self, object: ObjectId) -> Result<Vec<Right>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT subject_id, object_id, kind FROM rights WHERE object_id = ?1",
            )?;
            let mut rights = stmt
                .query_map(params![object.0], row_to_right)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rights.sort();
            Ok(rights)
        })
        .await
    }

    async fn rights_for_subject(&self, subject: PrincipalId) -> Result<Vec<Right>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT subject_id, object_id, kind FROM rights WHERE subject_id = ?1",
            )?;
            let mut rights = stmt
                .query_map(params![subject.0], row_to_right)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rights.sort();
            Ok(rights)
        })
        .await
    }

    async fn all_rights(&self) -> Result<Vec<Right>> {
        self.blocking(|conn| {
            // Sorted in Rust: `kind` is stored as text, whose collation
            // differs from `RightKind`'s order.
            let mut stmt = conn.prepare("SELECT subject_id, object_id, kind FROM rights")?;
            let mut rights = stmt
                .query_map([], row_to_right)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rights.sort();
            Ok(rights)
        })
        .await
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, entry: &AuditEntry) -> Result<AuditId> {
        let action = serde_json::to_string(&entry.action)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let actor = entry.actor.name().to_string();
        let outcome = entry.outcome;
        let target = entry.target_principal;
        let object_name = entry.object_name.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO audit (timestamp, actor, action, result, target_principal_id, object_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    now_millis(),
                    actor,
                    action,
                    outcome.as_str(),
                    target.map(|p| p.0),
                    object_name,
                ],
            )?;
            Ok(AuditId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AUDIT_COLUMNS} FROM audit ORDER BY id DESC LIMIT ?1"
            ))?;
            let records = stmt
                .query_map(params![limit], row_to_audit)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn all_records(&self) -> Result<Vec<AuditRecord>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {AUDIT_COLUMNS} FROM audit ORDER BY id"))?;
            let records = stmt
                .query_map([], row_to_audit)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }
}

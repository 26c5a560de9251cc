//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Principals issued by the identity layer
        CREATE TABLE principals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,      -- bcrypt
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        -- Protected objects; ownership is fixed at creation
        CREATE TABLE objects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            owner_id INTEGER NOT NULL,        -- owner may later be deleted; object stays
            created_at INTEGER NOT NULL
        );

        -- The rights graph. The triple is the identity of an edge.
        CREATE TABLE rights (
            subject_id INTEGER NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
            object_id INTEGER NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('read', 'write', 'take')),
            created_at INTEGER NOT NULL,
            PRIMARY KEY (subject_id, object_id, kind)
        ) WITHOUT ROWID;

        -- Append-only audit trail, ordered by id
        CREATE TABLE audit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            actor TEXT NOT NULL,              -- claimed actor name, unverified
            action TEXT NOT NULL,             -- JSON-encoded AuditAction
            result TEXT NOT NULL CHECK (result IN ('success', 'fail', 'denied')),
            target_principal_id INTEGER,
            object_name TEXT
        );

        CREATE INDEX idx_rights_object ON rights(object_id);
        CREATE INDEX idx_objects_owner ON objects(owner_id);
        "#,
    )?;

    Ok(())
}

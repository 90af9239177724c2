//! Connection management: a single `rusqlite::Connection` behind a mutex, opened with
//! WAL journaling and migrated on startup. A single-connection design is a deliberate
//! simplification over a write-connection-plus-read-pool split (see DESIGN.md) — this
//! workspace's query volume does not justify the extra moving parts.

use librarian_core::error::StorageError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::MIGRATIONS;

/// Shared handle to the underlying SQLite connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Mutex<Connection>>,
}

impl ConnectionHandle {
    pub fn open(path: &Path, journal_wal: bool) -> Result<Self, StorageError> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::transient(format!("failed to open database: {e}")))?;
        Self::from_connection(conn, journal_wal)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::transient(format!("failed to open in-memory database: {e}")))?;
        // WAL is meaningless for :memory: databases; skip the pragma.
        Self::finish_open(conn, false)
    }

    fn from_connection(conn: Connection, journal_wal: bool) -> Result<Self, StorageError> {
        if journal_wal {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .unwrap_or_else(|_| "DELETE".to_string());
            if mode.to_uppercase() != "WAL" {
                tracing::warn!(mode = %mode, "WAL journal mode unavailable, falling back");
            }
        }
        Self::finish_open(conn, journal_wal)
    }

    fn finish_open(conn: Connection, _journal_wal: bool) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StorageError::corruption(format!("failed to set pragmas: {e}")))?;
        let handle = Self {
            inner: Arc::new(Mutex::new(conn)),
        };
        handle.migrate()?;
        Ok(handle)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.inner.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL);",
        )
        .map_err(|e| StorageError::corruption(format!("failed to create migrations table: {e}")))?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
            .map_err(|e| StorageError::corruption(format!("failed to read schema version: {e}")))?;

        for (version, sql) in MIGRATIONS.iter().enumerate() {
            let version = version as i64 + 1;
            if version <= current {
                continue;
            }
            conn.execute_batch(sql)
                .map_err(|e| StorageError::corruption(format!("migration {version} failed: {e}")))?;
            conn.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
                [version],
            )
            .map_err(|e| StorageError::corruption(format!("failed to record migration {version}: {e}")))?;
            tracing::info!(version, "applied schema migration");
        }
        Ok(())
    }

    /// Run a closure with exclusive access to the connection. All multi-row writes
    /// that must be transactional should use [`ConnectionHandle::with_transaction`]
    /// instead.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T, StorageError> {
        let conn = self.inner.lock();
        f(&conn).map_err(classify_rusqlite_error)
    }

    /// Run a closure inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let mut conn = self.inner.lock();
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::transient(format!("failed to open transaction: {e}")))?;
        let result = f(&tx).map_err(classify_rusqlite_error)?;
        tx.commit()
            .map_err(|e| StorageError::transient(format!("failed to commit transaction: {e}")))?;
        Ok(result)
    }

    pub fn vacuum(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| conn.execute_batch("VACUUM;"))
    }
}

fn classify_rusqlite_error(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::DatabaseBusy
                || inner.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            StorageError::transient(err.to_string())
        }
        other => StorageError::corruption(other.to_string()),
    }
}

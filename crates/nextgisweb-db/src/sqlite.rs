//! SQLite backend using `rusqlite`.
//!
//! [`SqliteBackend`] owns a single connection behind an async mutex. Plain
//! statements run through `tokio::task::spawn_blocking`. A [`Transaction`]
//! takes the connection for its whole lifetime so that the statements of one
//! request cannot interleave with another's; its statements run on the
//! calling task.
//!
//! Foreign keys are enabled on open, so `ON DELETE CASCADE` declared in
//! [`ModelMeta`](crate::model::ModelMeta) is enforced.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::types::ValueRef;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::executor::DbExecutor;
use crate::model::ModelMeta;
use crate::value::{Row, Value};
use nextgisweb_core::{NgwError, NgwResult};

/// A SQLite database backend.
pub struct SqliteBackend {
    path: PathBuf,
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteBackend {
    /// Opens a database at the given path; `:memory:` opens an in-memory
    /// database. WAL journal mode and foreign keys are enabled.
    pub fn open(path: impl Into<PathBuf>) -> NgwResult<Self> {
        let path = path.into();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| NgwError::OperationalError(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| NgwError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened SQLite database");

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    pub fn memory() -> NgwResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Creates the tables of the given models if they do not exist yet.
    pub async fn create_tables(&self, metas: &[&ModelMeta]) -> NgwResult<()> {
        for meta in metas {
            self.execute_sql(&meta.create_table_sql(), &[]).await?;
            tracing::debug!(table = meta.table, "Ensured table");
        }
        Ok(())
    }

    /// Begins a transaction. The connection is held until the transaction
    /// is committed, rolled back or dropped (which rolls back).
    pub async fn begin(&self) -> NgwResult<Transaction> {
        let guard = self.conn.clone().lock_owned().await;
        guard.execute_batch("BEGIN").map_err(map_err)?;
        Ok(Transaction {
            conn: std::sync::Mutex::new(Some(guard)),
        })
    }
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> NgwResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || execute(&conn.blocking_lock(), &sql, &params))
            .await
            .map_err(|e| NgwError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> NgwResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || query(&conn.blocking_lock(), &sql, &params))
            .await
            .map_err(|e| NgwError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> NgwResult<i64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || insert(&conn.blocking_lock(), &sql, &params))
            .await
            .map_err(|e| NgwError::DatabaseError(format!("Task join error: {e}")))?
    }
}

/// An open transaction holding the backend's connection.
pub struct Transaction {
    conn: std::sync::Mutex<Option<OwnedMutexGuard<rusqlite::Connection>>>,
}

impl Transaction {
    fn with_conn<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> NgwResult<T>) -> NgwResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| NgwError::DatabaseError("Transaction lock poisoned".to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| NgwError::DatabaseError("Transaction already finished".to_string()))?;
        f(conn)
    }

    fn finish(&self, statement: &str) -> NgwResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| NgwError::DatabaseError("Transaction lock poisoned".to_string()))?;
        let conn = guard
            .take()
            .ok_or_else(|| NgwError::DatabaseError("Transaction already finished".to_string()))?;
        drop(guard);
        conn.execute_batch(statement).map_err(|e| {
            // A failed COMMIT leaves the transaction open on the connection.
            if !conn.is_autocommit() {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %rollback, "Rollback after failed {statement} failed");
                }
            }
            map_err(e)
        })
    }

    /// Commits the transaction.
    pub fn commit(self) -> NgwResult<()> {
        self.finish("COMMIT")
    }

    /// Rolls the transaction back.
    pub fn rollback(self) -> NgwResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.conn.lock() {
            if let Some(conn) = guard.take() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %e, "Rollback of dropped transaction failed");
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DbExecutor for Transaction {
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> NgwResult<u64> {
        self.with_conn(|conn| execute(conn, sql, params))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> NgwResult<Vec<Row>> {
        self.with_conn(|conn| query(conn, sql, params))
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> NgwResult<i64> {
        self.with_conn(|conn| insert(conn, sql, params))
    }
}

// ── Statement helpers ──────────────────────────────────────────────────

fn map_err(e: rusqlite::Error) -> NgwError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            NgwError::IntegrityError(e.to_string())
        }
        _ => NgwError::DatabaseError(e.to_string()),
    }
}

fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> NgwResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
            Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string().as_str()),
        }
        .map_err(|e| NgwError::DatabaseError(format!("Bind error: {e}")))?;
    }
    Ok(())
}

fn execute(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> NgwResult<u64> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    bind_params(&mut stmt, params)?;
    let count = stmt.raw_execute().map_err(map_err)?;
    Ok(count as u64)
}

fn insert(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> NgwResult<i64> {
    execute(conn, sql, params)?;
    Ok(conn.last_insert_rowid())
}

fn query(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> NgwResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    bind_params(&mut stmt, params)?;

    let mut raw_rows = stmt.raw_query();
    let mut rows = Vec::new();
    while let Some(row) = raw_rows.next().map_err(map_err)? {
        let values = (0..column_names.len())
            .map(|i| match row.get_ref(i).unwrap_or(ValueRef::Null) {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Int(v),
                ValueRef::Real(v) => Value::Float(v),
                ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).to_string()),
                ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
            })
            .collect();
        rows.push(Row::new(column_names.clone(), values));
    }
    Ok(rows)
}

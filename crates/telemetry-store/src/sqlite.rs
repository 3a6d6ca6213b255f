//! SQLite storage backend.

use crate::{ConnectionProvider, PreparedInsert, StoreError};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_config::DatabaseConfig;
use tracing::debug;

/// Busy timeout in effect whenever no statement has set its own.
pub const BASE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_audit (
    usage_audit_id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    org_id TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    session_id TEXT NOT NULL,
    object_id TEXT NOT NULL,
    module_id TEXT NOT NULL,
    command TEXT NOT NULL,
    classname TEXT,
    object_type TEXT NOT NULL,
    process_time INTEGER NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_usage_audit_session ON usage_audit(session_id);
CREATE INDEX IF NOT EXISTS idx_usage_audit_module ON usage_audit(module_id, command);
"#;

/// Create the `usage_audit` table and its indexes if missing.
pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Connection provider over a single shared SQLite connection.
#[derive(Clone)]
pub struct SqliteConnectionProvider {
    conn: Arc<Mutex<Connection>>,
    outstanding: Arc<AtomicUsize>,
}

impl SqliteConnectionProvider {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open the database described by the `database` config section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BASE_BUSY_TIMEOUT)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            outstanding: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Statements prepared but not yet released.
    pub fn outstanding_statements(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Rows recorded for a session, oldest first.
    pub fn rows_for_session(&self, session_id: &str) -> Result<Vec<UsageAuditRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT usage_audit_id, tenant_id, org_id, created_by, updated_by, session_id, \
             object_id, module_id, command, classname, object_type, process_time, metadata \
             FROM usage_audit WHERE session_id = ?1 ORDER BY process_time, rowid",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![session_id], |row| {
                Ok(UsageAuditRow {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    org_id: row.get(2)?,
                    created_by: row.get(3)?,
                    updated_by: row.get(4)?,
                    session_id: row.get(5)?,
                    object_id: row.get(6)?,
                    module_id: row.get(7)?,
                    command: row.get(8)?,
                    classname: row.get(9)?,
                    object_type: row.get(10)?,
                    process_time: row.get(11)?,
                    metadata: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl ConnectionProvider for SqliteConnectionProvider {
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedInsert>, StoreError> {
        {
            // Compile once up front so syntax errors surface here, and leave
            // the compiled statement in the connection's cache.
            let conn = self.conn.lock();
            conn.prepare_cached(sql)?;
        }

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SqliteStatement {
            conn: Arc::clone(&self.conn),
            sql: sql.to_string(),
            params: Vec::new(),
            timeout: None,
        }))
    }

    fn release(&self, statement: Box<dyn PreparedInsert>) -> Result<(), StoreError> {
        drop(statement);
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::unexpected("released a statement that was never prepared"))
    }
}

/// Statement handle bound to a [`SqliteConnectionProvider`] connection.
struct SqliteStatement {
    conn: Arc<Mutex<Connection>>,
    sql: String,
    params: Vec<Option<String>>,
    timeout: Option<Duration>,
}

impl PreparedInsert for SqliteStatement {
    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        self.timeout = Some(timeout);
        Ok(())
    }

    fn bind_text(&mut self, index: usize, value: Option<String>) -> Result<(), StoreError> {
        if index == 0 {
            return Err(StoreError::unexpected("parameter indices start at 1"));
        }
        if self.params.len() < index {
            self.params.resize(index, None);
        }
        self.params[index - 1] = value;
        Ok(())
    }

    fn execute_update(&mut self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let Some(timeout) = self.timeout else {
            return self.execute_locked(&conn);
        };

        // Connection-wide setting; restored before the lock is released.
        conn.busy_timeout(timeout)?;
        let result = self.execute_locked(&conn);
        conn.busy_timeout(BASE_BUSY_TIMEOUT)?;
        result
    }
}

impl SqliteStatement {
    fn execute_locked(&self, conn: &Connection) -> Result<usize, StoreError> {
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let expected = stmt.parameter_count();
        if expected != self.params.len() {
            return Err(StoreError::unexpected(format!(
                "statement expects {expected} parameters, {} bound",
                self.params.len()
            )));
        }

        let rows = stmt.execute(rusqlite::params_from_iter(self.params.iter()))?;
        debug!(rows, "usage audit statement executed");
        Ok(rows)
    }
}

/// One persisted usage audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageAuditRow {
    pub id: String,
    pub tenant_id: String,
    pub org_id: String,
    pub created_by: String,
    pub updated_by: String,
    pub session_id: String,
    pub object_id: String,
    pub module_id: String,
    pub command: String,
    pub classname: Option<String>,
    pub object_type: String,
    pub process_time: i64,
    pub metadata: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_test_utils::{assert_ok, temp_db_path};

    const INSERT_TWO: &str = "INSERT INTO usage_audit (usage_audit_id, tenant_id, org_id, \
        created_by, updated_by, session_id, object_id, module_id, command, object_type, \
        process_time) VALUES (?, '0', '0', 'u', 'u', ?, 'o', 'm', 'c', 'P', 1)";

    #[test]
    fn test_open_creates_schema_in_file() {
        let (_dir, path) = temp_db_path();
        let provider = assert_ok!(SqliteConnectionProvider::open(&path));
        assert!(path.exists());
        assert!(provider.rows_for_session("nobody").unwrap().is_empty());

        // Reopening an existing database keeps working.
        drop(provider);
        assert_ok!(SqliteConnectionProvider::open(&path));
    }

    #[test]
    fn test_prepare_and_release_track_outstanding() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let statement = provider.prepare(INSERT_TWO).unwrap();
        assert_eq!(provider.outstanding_statements(), 1);

        provider.release(statement).unwrap();
        assert_eq!(provider.outstanding_statements(), 0);
    }

    #[test]
    fn test_release_without_prepare_fails() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let other = SqliteConnectionProvider::open_in_memory().unwrap();
        let statement = other.prepare(INSERT_TWO).unwrap();

        let result = provider.release(statement);
        assert!(matches!(result, Err(StoreError::Unexpected(_))));
    }

    #[test]
    fn test_prepare_rejects_invalid_sql() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let result = provider.prepare("INSERT INTO missing_table VALUES (?)");
        assert!(matches!(result, Err(StoreError::Backend { .. })));
        assert_eq!(provider.outstanding_statements(), 0);
    }

    #[test]
    fn test_execute_binds_positionally() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let mut statement = provider.prepare(INSERT_TWO).unwrap();
        statement.set_query_timeout(Duration::from_secs(1)).unwrap();
        statement.bind_text(2, Some("s1".to_string())).unwrap();
        statement.bind_text(1, Some("row-1".to_string())).unwrap();

        assert_eq!(statement.execute_update().unwrap(), 1);
        provider.release(statement).unwrap();

        let rows = provider.rows_for_session("s1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "row-1");
        assert_eq!(rows[0].process_time, 1);
    }

    fn busy_timeout_ms(provider: &SqliteConnectionProvider) -> i64 {
        provider
            .conn
            .lock()
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_statement_timeout_does_not_outlive_execute() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        assert_eq!(busy_timeout_ms(&provider), 5_000);

        let mut statement = provider.prepare(INSERT_TWO).unwrap();
        statement.set_query_timeout(Duration::from_secs(60)).unwrap();
        statement.bind_text(1, Some("row-1".to_string())).unwrap();
        statement.bind_text(2, Some("s1".to_string())).unwrap();
        statement.execute_update().unwrap();
        provider.release(statement).unwrap();
        assert_eq!(busy_timeout_ms(&provider), 5_000);

        let mut failing = provider.prepare(INSERT_TWO).unwrap();
        failing.set_query_timeout(Duration::from_secs(30)).unwrap();
        failing.bind_text(1, Some("row-1".to_string())).unwrap();
        failing.bind_text(2, Some("s1".to_string())).unwrap();
        assert!(failing.execute_update().is_err());
        provider.release(failing).unwrap();
        assert_eq!(busy_timeout_ms(&provider), 5_000);
    }

    #[test]
    fn test_execute_with_missing_parameter_fails() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let mut statement = provider.prepare(INSERT_TWO).unwrap();
        statement.bind_text(1, Some("row-1".to_string())).unwrap();

        let result = statement.execute_update();
        assert!(matches!(result, Err(StoreError::Unexpected(_))));
    }

    #[test]
    fn test_zero_index_rejected() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let mut statement = provider.prepare(INSERT_TWO).unwrap();
        assert!(statement.bind_text(0, None).is_err());
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_ok!(ensure_schema(&conn));
        assert_ok!(ensure_schema(&conn));
    }

    #[test]
    fn test_from_config_without_path_is_in_memory() {
        let provider = SqliteConnectionProvider::from_config(&DatabaseConfig::default()).unwrap();
        assert!(provider.rows_for_session("s1").unwrap().is_empty());
    }
}

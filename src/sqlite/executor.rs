use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

use crate::dialect::Dialect;
use crate::driver::{DatabaseExecutor, ExecOutcome, is_insert_statement};
use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::{DatabaseType, RowValues};

use super::config::SqliteTarget;
use super::dialect::SqliteDialect;
use super::params::Params;
use super::query::build_result_set;

/// Shared handle to the single `rusqlite` connection of a session.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// `SQLite` connection driven on tokio's blocking pool.
pub struct SqliteExecutor {
    conn: Option<SharedSqliteConnection>,
    target: SqliteTarget,
    dialect: SqliteDialect,
}

impl SqliteExecutor {
    pub(crate) fn new(conn: SharedSqliteConnection, target: SqliteTarget) -> Self {
        Self {
            conn: Some(conn),
            target,
            dialect: SqliteDialect,
        }
    }

    /// Where this connection keeps its data.
    #[must_use]
    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Run synchronous `rusqlite` logic against the underlying connection.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConnectionError` once the connection is closed, otherwise
    /// whatever `func` returns.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlBridgeError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlBridgeError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.conn_handle()?, func).await
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, SqlBridgeError> {
        self.conn
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| SqlBridgeError::ConnectionError("sqlite connection is closed".into()))
    }
}

impl fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteExecutor")
            .field("target", &self.target)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

#[async_trait]
impl DatabaseExecutor for SqliteExecutor {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlBridgeError> {
        let sql_owned = sql.to_owned();
        run_blocking(self.conn_handle()?, move |guard| {
            guard
                .execute_batch(&sql_owned)
                .map_err(SqlBridgeError::SqliteError)
        })
        .await
    }

    async fn execute_select(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlBridgeError> {
        let sql_owned = sql.to_owned();
        let params_owned = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard
                .prepare(&sql_owned)
                .map_err(SqlBridgeError::SqliteError)?;
            build_result_set(&mut stmt, &params_owned.as_refs())
        })
        .await
    }

    async fn execute_dml(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlBridgeError> {
        let sql_owned = sql.to_owned();
        let params_owned = Params::convert(params);
        let generates_id = is_insert_statement(sql);
        run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard
                .prepare(&sql_owned)
                .map_err(SqlBridgeError::SqliteError)?;
            let refs = params_owned.as_refs();
            // Row-returning statements are stepped to completion and report the rows they produced.
            let affected = if stmt.column_count() > 0 {
                let mut rows = stmt.query(&refs[..])?;
                let mut produced = 0_usize;
                while rows.next()?.is_some() {
                    produced += 1;
                }
                produced
            } else {
                stmt.execute(&refs[..])?
            };
            let affected_rows = u64::try_from(affected).map_err(|e| {
                SqlBridgeError::ExecutionError(format!(
                    "sqlite affected rows conversion error: {e}"
                ))
            })?;
            let last_insert_id = if generates_id && affected_rows > 0 {
                guard.last_insert_rowid()
            } else {
                0
            };
            Ok(ExecOutcome {
                affected_rows,
                last_insert_id,
            })
        })
        .await
    }

    async fn server_version(&mut self) -> Result<String, SqlBridgeError> {
        run_blocking(self.conn_handle()?, |guard| {
            guard
                .query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0))
                .map_err(SqlBridgeError::SqliteError)
        })
        .await
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        let Some(handle) = self.conn.take() else {
            return Ok(());
        };
        // Another clone can only exist while a blocking task is still running; dropping ours
        // lets that task close the connection when it finishes.
        let Ok(mutex) = Arc::try_unwrap(handle) else {
            return Ok(());
        };
        let conn = mutex.into_inner();
        spawn_blocking(move || conn.close().map_err(|(_, err)| SqlBridgeError::SqliteError(err)))
            .await
            .map_err(|e| {
                SqlBridgeError::ExecutionError(format!("sqlite spawn_blocking join error: {e}"))
            })?
    }
}

async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, SqlBridgeError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlBridgeError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut *guard)
    })
    .await
    .map_err(|e| SqlBridgeError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> SqliteExecutor {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        SqliteExecutor::new(Arc::new(Mutex::new(conn)), SqliteTarget::Memory)
    }

    #[tokio::test]
    async fn dml_reports_rows_and_rowid() {
        let mut exec = executor();
        exec.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")
            .await
            .unwrap();
        let out = exec
            .execute_dml(
                "INSERT INTO t (v) VALUES (?), (?)",
                &[RowValues::Text("a".into()), RowValues::Text("b".into())],
            )
            .await
            .unwrap();
        assert_eq!(out.affected_rows, 2);
        assert_eq!(out.last_insert_id, 2);

        let out = exec
            .execute_dml("UPDATE t SET v = ?", &[RowValues::Text("c".into())])
            .await
            .unwrap();
        assert_eq!(out, ExecOutcome { affected_rows: 2, last_insert_id: 0 });
    }

    #[tokio::test]
    async fn row_returning_statements_through_dml() {
        let mut exec = executor();
        let out = exec
            .execute_dml("SELECT 1 UNION ALL SELECT 2", &[])
            .await
            .unwrap();
        assert_eq!(out.affected_rows, 2);
        assert_eq!(out.last_insert_id, 0);
    }

    #[tokio::test]
    async fn closed_connection_rejects_work() {
        let mut exec = executor();
        assert!(exec.server_version().await.unwrap().starts_with('3'));
        exec.close().await.unwrap();
        exec.close().await.unwrap();
        let err = exec.execute_select("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, SqlBridgeError::ConnectionError(_)));
    }
}

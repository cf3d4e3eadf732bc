use std::fmt;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

use crate::dialect::Dialect;
use crate::driver::{DatabaseExecutor, ExecOutcome, is_insert_statement};
use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::{DatabaseType, RowValues};

use super::dialect::PostgresDialect;
use super::params::Params;
use super::query::build_result_set;

/// A single `tokio-postgres` client plus the task driving its connection.
pub struct PostgresExecutor {
    client: Option<Client>,
    connection_task: Option<JoinHandle<()>>,
    dialect: PostgresDialect,
}

impl PostgresExecutor {
    pub(crate) fn new(client: Client, connection_task: JoinHandle<()>) -> Self {
        Self {
            client: Some(client),
            connection_task: Some(connection_task),
            dialect: PostgresDialect,
        }
    }

    fn client(&self) -> Result<&Client, SqlBridgeError> {
        match &self.client {
            Some(client) if !client.is_closed() => Ok(client),
            Some(_) => Err(SqlBridgeError::ConnectionError(
                "postgres connection was lost".into(),
            )),
            None => Err(SqlBridgeError::ConnectionError(
                "postgres connection is closed".into(),
            )),
        }
    }

    /// Value of the sequence most recently advanced in this session, 0 when there is none
    /// (the table has no serial or identity column).
    async fn last_value(client: &Client) -> i64 {
        match client.query_opt("SELECT lastval()", &[]).await {
            Ok(Some(row)) => row.try_get::<_, i64>(0).unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::trace!(error = %e, "lastval unavailable after insert");
                0
            }
        }
    }
}

impl fmt::Debug for PostgresExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresExecutor")
            .field("open", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for PostgresExecutor {
    fn drop(&mut self) {
        if let Some(task) = self.connection_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl DatabaseExecutor for PostgresExecutor {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlBridgeError> {
        self.client()?.batch_execute(sql).await?;
        Ok(())
    }

    async fn execute_select(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlBridgeError> {
        let client = self.client()?;
        let stmt = client.prepare(sql).await?;
        let converted = Params::convert(params);
        let rows = client.query(&stmt, converted.as_refs()).await?;
        build_result_set(&stmt, &rows)
    }

    async fn execute_dml(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlBridgeError> {
        let client = self.client()?;
        let stmt = client.prepare(sql).await?;
        let converted = Params::convert(params);
        let affected_rows = client.execute(&stmt, converted.as_refs()).await?;
        let last_insert_id = if affected_rows > 0 && is_insert_statement(sql) {
            Self::last_value(client).await
        } else {
            0
        };
        Ok(ExecOutcome {
            affected_rows,
            last_insert_id,
        })
    }

    async fn server_version(&mut self) -> Result<String, SqlBridgeError> {
        let row = self.client()?.query_one("SHOW server_version", &[]).await?;
        Ok(row.try_get::<_, String>(0)?)
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        // Dropping the client ends the connection future; the task then finishes on its own.
        self.client.take();
        if let Some(task) = self.connection_task.take() {
            task.abort();
        }
        Ok(())
    }
}

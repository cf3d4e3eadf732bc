use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::{DatabaseType, RowValues};

/// What a data-modifying statement reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExecOutcome {
    pub affected_rows: u64,
    /// Id generated by the statement, or 0 when it generated none.
    pub last_insert_id: i64,
}

/// A live connection to one backend.
///
/// Statements arrive with placeholders already in the backend's syntax and parameters in
/// binding order. Implementations map driver failures to [`SqlBridgeError`] but do not log or
/// count; the session does that.
#[async_trait]
pub trait DatabaseExecutor: fmt::Debug + Send {
    fn database_type(&self) -> DatabaseType;

    fn dialect(&self) -> &dyn Dialect;

    /// Executes a script of one or more statements without parameters.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlBridgeError>;

    /// Executes a single statement and returns its rows.
    async fn execute_select(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlBridgeError>;

    /// Executes a single statement and returns the affected row count and generated id.
    async fn execute_dml(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlBridgeError>;

    async fn server_version(&mut self) -> Result<String, SqlBridgeError>;

    /// Release the connection. Further calls fail.
    async fn close(&mut self) -> Result<(), SqlBridgeError>;
}

/// Whether a statement can generate a row id (leading `INSERT` or `REPLACE`).
pub(crate) fn is_insert_statement(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

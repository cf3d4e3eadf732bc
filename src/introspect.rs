//! Schema introspection on a live session.
//!
//! Failures follow the session error mode; in silent mode a failed lookup reads as an empty
//! schema (no tables, no columns, table absent).

use std::future::Future;
use std::panic::Location;

use crate::error::SqlBridgeError;
use crate::executor::{CallSite, Database};
use crate::results::ResultSet;
use crate::schema::{ColumnDescriptor, ColumnSpec};
use crate::types::{Params, RowValues};

impl Database {
    /// Physical names of the user tables, sorted.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::Statement` when the catalog query fails in throwing mode.
    #[track_caller]
    pub fn list_tables(&mut self) -> impl Future<Output = Result<Vec<String>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        async move {
            let sql = self.dialect().list_tables_sql();
            let rows = self.run_select(sql, Params::none(), call).await?;
            Ok(rows
                .map(|rows| {
                    rows.iter()
                        .filter_map(|row| row.get_by_index(0).and_then(RowValues::as_text))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// The catalog rows behind [`Database::list_tables`], `name` first. `None` in silent mode
    /// when the catalog query fails.
    ///
    /// # Errors
    /// As [`Database::list_tables`].
    #[track_caller]
    pub fn list_tables_full(
        &mut self,
    ) -> impl Future<Output = Result<Option<ResultSet>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        async move {
            let sql = self.dialect().list_tables_full_sql();
            self.run_select(sql, Params::none(), call).await
        }
    }

    /// Whether the logical table `name` exists.
    ///
    /// # Errors
    /// As [`Database::list_tables`].
    #[track_caller]
    pub fn table_exists(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<bool, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(name);
        async move { Ok(self.physical_exists(&physical, call).await?.unwrap_or(false)) }
    }

    /// Columns of the logical table `name`, in declaration order. Unknown tables have none.
    ///
    /// # Errors
    /// As [`Database::list_tables`], plus `SqlBridgeError::ExecutionError` for malformed
    /// catalog rows.
    #[track_caller]
    pub fn get_columns(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<ColumnDescriptor>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(name);
        async move { self.describe_physical(&physical, call).await }
    }

    /// Column names of the logical table `name`, in declaration order.
    ///
    /// # Errors
    /// As [`Database::get_columns`].
    #[track_caller]
    pub fn get_column_names(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(name);
        async move {
            Ok(self
                .describe_physical(&physical, call)
                .await?
                .into_iter()
                .map(|column| column.name)
                .collect())
        }
    }

    /// Add `column` unless the table already has it. Returns `true` when the column is present
    /// afterwards, `false` when a silent-mode failure prevented it.
    ///
    /// # Errors
    /// As [`Database::add_column`].
    #[track_caller]
    pub fn add_column_if_not_exists(
        &mut self,
        table: &str,
        column: &str,
        spec: impl Into<ColumnSpec>,
    ) -> impl Future<Output = Result<bool, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(table);
        let spec = spec.into();
        async move {
            if self.has_column(&physical, column, call).await? {
                return Ok(true);
            }
            let sql = self.dialect().add_column_sql(&physical, column, &spec);
            Ok(self.run_exec(&sql, Params::none(), call).await?.is_some())
        }
    }

    /// Drop `column` if the table has it. Returns `true` when the column is absent afterwards,
    /// `false` when a silent-mode failure prevented it.
    ///
    /// # Errors
    /// As [`Database::drop_column`].
    #[track_caller]
    pub fn drop_column_if_exists(
        &mut self,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<bool, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(table);
        async move {
            if !self.has_column(&physical, column, call).await? {
                return Ok(true);
            }
            let sql = self.dialect().drop_column_sql(&physical, column);
            Ok(self.run_exec(&sql, Params::none(), call).await?.is_some())
        }
    }

    pub(crate) async fn physical_exists(
        &mut self,
        physical: &str,
        call: CallSite,
    ) -> Result<Option<bool>, SqlBridgeError> {
        let query = self.dialect().table_exists_query(physical);
        let count = self
            .run_scalar(&query.query, Params::Positional(query.params), call)
            .await?;
        Ok(count.map(|value| value.as_int().is_some_and(|n| *n > 0)))
    }

    pub(crate) async fn describe_physical(
        &mut self,
        physical: &str,
        call: CallSite,
    ) -> Result<Vec<ColumnDescriptor>, SqlBridgeError> {
        let query = self.dialect().columns_query(physical);
        let Some(rows) = self
            .run_select(&query.query, Params::Positional(query.params), call)
            .await?
        else {
            return Ok(Vec::new());
        };
        match self.dialect().describe_columns(&rows) {
            Ok(columns) => Ok(columns),
            Err(err) => Ok(self.reject(err, call)?.unwrap_or_default()),
        }
    }

    /// Names of the primary-key columns, in declaration order.
    pub(crate) async fn primary_key_of(
        &mut self,
        physical: &str,
        call: CallSite,
    ) -> Result<Vec<String>, SqlBridgeError> {
        Ok(self
            .describe_physical(physical, call)
            .await?
            .into_iter()
            .filter(|column| column.key.is_primary())
            .map(|column| column.name)
            .collect())
    }

    async fn has_column(
        &mut self,
        physical: &str,
        column: &str,
        call: CallSite,
    ) -> Result<bool, SqlBridgeError> {
        Ok(self
            .describe_physical(physical, call)
            .await?
            .iter()
            .any(|existing| existing.name == column))
    }
}

use std::future::Future;
use std::panic::Location;

use crate::error::SqlBridgeError;
use crate::executor::Database;
use crate::schema::{ColumnSpec, CreateOptions, IndexKind, TableSchema};
use crate::types::Params;

impl Database {
    /// Create the logical table `name`. With `drop_first` an existing table is dropped before.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` for a schema without columns (nothing is run),
    /// otherwise as [`Database::execute`].
    #[track_caller]
    pub fn create_table(
        &mut self,
        name: &str,
        schema: &TableSchema,
        options: CreateOptions,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(name);
        let create = self
            .dialect()
            .create_table_sql(&physical, schema, options.if_not_exists);
        async move {
            let create = match create {
                Ok(sql) => sql,
                Err(err) => return self.reject(err, call),
            };
            if options.drop_first {
                let drop = self.dialect().drop_table_sql(&physical, true);
                if self.run_exec(&drop, Params::none(), call).await?.is_none() {
                    return Ok(None);
                }
            }
            Ok(self
                .run_exec(&create, Params::none(), call)
                .await?
                .map(|outcome| outcome.affected_rows))
        }
    }

    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn drop_table(
        &mut self,
        name: &str,
        if_exists: bool,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let sql = self
            .dialect()
            .drop_table_sql(&self.table_name(name), if_exists);
        async move {
            Ok(self
                .run_exec(&sql, Params::none(), call)
                .await?
                .map(|outcome| outcome.affected_rows))
        }
    }

    /// Index, unique index or primary key over `fields`, named `<table>_<field>_..`.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` without running anything when `fields` is empty,
    /// otherwise as [`Database::execute`].
    #[track_caller]
    pub fn add_index(
        &mut self,
        name: &str,
        kind: IndexKind,
        fields: &[&str],
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let sql = self
            .dialect()
            .add_index_sql(&self.table_name(name), kind, fields);
        async move {
            match sql {
                Ok(sql) => Ok(self
                    .run_exec(&sql, Params::none(), call)
                    .await?
                    .map(|outcome| outcome.affected_rows)),
                Err(err) => self.reject(err, call),
            }
        }
    }

    /// Add one column. It is NOT NULL only when `spec` carries a default.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn add_column(
        &mut self,
        table: &str,
        column: &str,
        spec: impl Into<ColumnSpec>,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let sql = self
            .dialect()
            .add_column_sql(&self.table_name(table), column, &spec.into());
        async move {
            Ok(self
                .run_exec(&sql, Params::none(), call)
                .await?
                .map(|outcome| outcome.affected_rows))
        }
    }

    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn drop_column(
        &mut self,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let sql = self
            .dialect()
            .drop_column_sql(&self.table_name(table), column);
        async move {
            Ok(self
                .run_exec(&sql, Params::none(), call)
                .await?
                .map(|outcome| outcome.affected_rows))
        }
    }

    /// Remove every row and reset the table's id counter. Returns the rows removed where the
    /// backend reports them.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn truncate(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let steps = self.dialect().truncate_statements(&self.table_name(name));
        async move {
            let mut removed = None;
            for step in steps {
                if let Some(required) = step.requires_table {
                    if self.physical_exists(required, call).await? != Some(true) {
                        continue;
                    }
                }
                let Some(outcome) = self
                    .run_exec(
                        &step.statement.query,
                        Params::Positional(step.statement.params),
                        call,
                    )
                    .await?
                else {
                    return Ok(None);
                };
                removed.get_or_insert(outcome.affected_rows);
            }
            Ok(removed)
        }
    }
}

//! Row insert, update and delete.
//!
//! The `build_*` functions only produce SQL and parameters; the `Database` methods run them.
//! Column lists come out in sorted order because rows are [`RowMap`]s.

use std::future::Future;
use std::panic::Location;

use crate::dialect::Dialect;
use crate::error::SqlBridgeError;
use crate::executor::Database;
use crate::schema::InsertMode;
use crate::types::{Params, QueryAndParams, RowMap, RowValues};

/// Multi-row `INSERT` (or the dialect's replace form) with one `?` tuple per row.
///
/// `primary_key` is only consulted for replace statements on dialects that need it.
///
/// ```rust
/// use sql_bridge::prelude::*;
/// use sql_bridge::mutation::build_insert;
/// use sql_bridge::sqlite::SqliteDialect;
///
/// let rows = [row! { "time" => 2, "station" => "A" }, row! { "station" => "B", "time" => 1 }];
/// let stmt = build_insert(&SqliteDialect, "p_status", &rows, InsertMode::Insert, &[])?;
/// assert_eq!(
///     stmt.query,
///     "INSERT INTO \"p_status\" (\"station\", \"time\") VALUES (?, ?), (?, ?)"
/// );
/// assert_eq!(stmt.params.len(), 4);
/// # Ok::<(), SqlBridgeError>(())
/// ```
///
/// # Errors
/// Returns `SqlBridgeError::EmptyOperand` for an empty batch or rows without columns, and
/// `SqlBridgeError::SchemaMismatch` when rows disagree on their column set.
pub fn build_insert(
    dialect: &dyn Dialect,
    physical: &str,
    rows: &[RowMap],
    mode: InsertMode,
    primary_key: &[String],
) -> Result<QueryAndParams, SqlBridgeError> {
    let Some(first) = rows.first() else {
        return Err(SqlBridgeError::EmptyOperand(format!(
            "insert into {physical} without rows"
        )));
    };
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    if columns.is_empty() {
        return Err(SqlBridgeError::EmptyOperand(format!(
            "insert into {physical} without columns"
        )));
    }
    for (idx, row) in rows.iter().enumerate().skip(1) {
        if !row.keys().map(String::as_str).eq(columns.iter().copied()) {
            return Err(SqlBridgeError::SchemaMismatch(format!(
                "row {idx} has columns [{}], expected [{}]",
                row.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
                columns.join(", ")
            )));
        }
    }

    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    let quoted: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
    let mut query = format!(
        "{} {} ({}) VALUES {}",
        dialect.insert_verb(mode),
        dialect.quote_table(physical),
        quoted.join(", "),
        vec![tuple.as_str(); rows.len()].join(", ")
    );
    if let Some(clause) = dialect.conflict_clause(mode, &columns, primary_key) {
        query.push_str(&clause);
    }
    let params = rows
        .iter()
        .flat_map(|row| row.values().cloned())
        .collect();
    Ok(QueryAndParams::new(query, params))
}

/// `UPDATE .. SET a = ?, .. WHERE b = ? AND ..`.
///
/// # Errors
/// Returns `SqlBridgeError::EmptyOperand` when `fields` or `where_eq` is empty.
pub fn build_update(
    dialect: &dyn Dialect,
    physical: &str,
    fields: &RowMap,
    where_eq: &RowMap,
) -> Result<QueryAndParams, SqlBridgeError> {
    if fields.is_empty() {
        return Err(SqlBridgeError::EmptyOperand(format!(
            "update of {physical} without fields"
        )));
    }
    let mut params = Vec::with_capacity(fields.len() + where_eq.len());
    let set: Vec<String> = fields
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{} = ?", dialect.quote_identifier(column))
        })
        .collect();
    let condition = where_clause(dialect, physical, where_eq, &mut params)?;
    Ok(QueryAndParams::new(
        format!(
            "UPDATE {} SET {} WHERE {condition}",
            dialect.quote_table(physical),
            set.join(", ")
        ),
        params,
    ))
}

/// `DELETE FROM .. WHERE b = ? AND ..`.
///
/// # Errors
/// Returns `SqlBridgeError::EmptyOperand` when `where_eq` is empty.
pub fn build_delete(
    dialect: &dyn Dialect,
    physical: &str,
    where_eq: &RowMap,
) -> Result<QueryAndParams, SqlBridgeError> {
    let mut params = Vec::with_capacity(where_eq.len());
    let condition = where_clause(dialect, physical, where_eq, &mut params)?;
    Ok(QueryAndParams::new(
        format!(
            "DELETE FROM {} WHERE {condition}",
            dialect.quote_table(physical)
        ),
        params,
    ))
}

/// Equality conjunction; `Null` compares with `IS NULL`.
fn where_clause(
    dialect: &dyn Dialect,
    physical: &str,
    where_eq: &RowMap,
    params: &mut Vec<RowValues>,
) -> Result<String, SqlBridgeError> {
    if where_eq.is_empty() {
        return Err(SqlBridgeError::EmptyOperand(format!(
            "write to {physical} without conditions"
        )));
    }
    let terms: Vec<String> = where_eq
        .iter()
        .map(|(column, value)| {
            let column = dialect.quote_identifier(column);
            if value.is_null() {
                format!("{column} IS NULL")
            } else {
                params.push(value.clone());
                format!("{column} = ?")
            }
        })
        .collect();
    Ok(terms.join(" AND "))
}

impl Database {
    /// Insert a batch of rows in one statement; returns the rows written.
    ///
    /// Every row must have the same columns. With [`InsertMode::Replace`] rows that collide on
    /// the primary key replace the existing ones.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::SchemaMismatch` or `SqlBridgeError::EmptyOperand` before any
    /// statement runs, otherwise as [`Database::execute`].
    #[track_caller]
    pub fn insert(
        &mut self,
        table: &str,
        rows: &[RowMap],
        mode: InsertMode,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let physical = self.table_name(table);
        async move {
            let mut statement = match build_insert(self.dialect(), &physical, rows, mode, &[]) {
                Ok(statement) => statement,
                Err(err) => return self.reject(err, call),
            };
            if mode == InsertMode::Replace && self.dialect().replace_needs_primary_key() {
                let primary_key = self.primary_key_of(&physical, call).await?;
                statement = build_insert(self.dialect(), &physical, rows, mode, &primary_key)?;
            }
            Ok(self
                .run_exec(&statement.query, Params::Positional(statement.params), call)
                .await?
                .map(|outcome| outcome.affected_rows))
        }
    }

    /// Insert a single row.
    ///
    /// # Errors
    /// As [`Database::insert`].
    #[track_caller]
    pub fn insert_row(
        &mut self,
        table: &str,
        row: &RowMap,
        mode: InsertMode,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        self.insert(table, std::slice::from_ref(row), mode)
    }

    /// Set `fields` on the rows matching every `where_eq` equality; returns the rows changed.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` for empty `fields` or `where_eq`, otherwise as
    /// [`Database::execute`].
    #[track_caller]
    pub fn update(
        &mut self,
        table: &str,
        fields: &RowMap,
        where_eq: &RowMap,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let statement = build_update(self.dialect(), &self.table_name(table), fields, where_eq);
        async move {
            match statement {
                Ok(statement) => Ok(self
                    .run_exec(&statement.query, Params::Positional(statement.params), call)
                    .await?
                    .map(|outcome| outcome.affected_rows)),
                Err(err) => self.reject(err, call),
            }
        }
    }

    /// Delete the rows matching every `where_eq` equality; returns the rows removed.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` for an empty `where_eq`, otherwise as
    /// [`Database::execute`].
    #[track_caller]
    pub fn delete(
        &mut self,
        table: &str,
        where_eq: &RowMap,
    ) -> impl Future<Output = Result<Option<u64>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let statement = build_delete(self.dialect(), &self.table_name(table), where_eq);
        async move {
            match statement {
                Ok(statement) => Ok(self
                    .run_exec(&statement.query, Params::Positional(statement.params), call)
                    .await?
                    .map(|outcome| outcome.affected_rows)),
                Err(err) => self.reject(err, call),
            }
        }
    }
}

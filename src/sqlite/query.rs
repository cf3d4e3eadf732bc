use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::{Statement, ToSql};

use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row. Blobs come back as (lossy) text.
///
/// # Errors
///
/// Returns `SqlBridgeError` if the column cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlBridgeError> {
    let value = row.get_ref(idx)?;
    Ok(match value {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            RowValues::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

/// Build a result set from a `SQLite` statement.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if query execution or result processing fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[&dyn ToSql],
) -> Result<ResultSet, SqlBridgeError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows_iter = stmt.query(params)?;
    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

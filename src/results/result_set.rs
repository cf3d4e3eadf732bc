use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::row::{ResultRow, index_columns};
use crate::types::RowValues;

/// Rows keyed by the text form of their first column.
pub type KeyedRows = BTreeMap<String, ResultRow>;

/// A result set from a database query
///
/// This struct represents the rows returned by a query plus the column names
/// they share.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<ResultRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
            column_index_cache: Arc::default(),
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Arc::new(index_columns(&column_names));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set. Rows added before column names are set are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            self.results.push(ResultRow {
                column_names: Arc::clone(column_names),
                values: row_values,
                column_index_cache: Arc::clone(&self.column_index_cache),
            });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&ResultRow> {
        self.results.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.results.iter()
    }

    /// Re-key the rows by their first column; later rows replace earlier ones with the same key.
    #[must_use]
    pub fn into_keyed(self) -> KeyedRows {
        let mut keyed = KeyedRows::new();
        for row in self.results {
            let key = row
                .get_by_index(0)
                .map(RowValues::key_string)
                .unwrap_or_default();
            keyed.insert(key, row);
        }
        keyed
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

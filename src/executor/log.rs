use std::panic::Location;
use std::time::Duration;

use serde::Serialize;

use crate::types::RowValues;

/// Backend error recorded by the most recent failing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub code: String,
    pub message: String,
}

/// One executed statement, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    /// SQL as sent to the backend.
    pub sql: String,
    pub params: Vec<RowValues>,
    pub duration: Duration,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub affected_rows: u64,
    pub fetched_rows: usize,
    pub insert_id: i64,
    /// `file:line` of the application call that issued the statement.
    pub caller: String,
}

impl QueryLogEntry {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

pub(crate) fn caller_string(caller: &Location<'_>) -> String {
    format!("{}:{}", caller.file(), caller.line())
}

/// Append-only statement history of a session.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    entries: Vec<QueryLogEntry>,
    enabled: bool,
}

impl QueryLog {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            enabled,
        }
    }

    pub(crate) fn push(&mut self, entry: QueryLogEntry) {
        if self.enabled {
            self.entries.push(entry);
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop or resume recording; existing entries are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn entries(&self) -> &[QueryLogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn last(&self) -> Option<&QueryLogEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryLogEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a QueryLog {
    type Item = &'a QueryLogEntry;
    type IntoIter = std::slice::Iter<'a, QueryLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sql: &str) -> QueryLogEntry {
        QueryLogEntry {
            sql: sql.to_string(),
            params: vec![RowValues::Int(1)],
            duration: Duration::from_micros(15),
            error_code: None,
            error_message: None,
            affected_rows: 1,
            fetched_rows: 0,
            insert_id: 0,
            caller: "src/main.rs:10".to_string(),
        }
    }

    #[test]
    fn disabled_log_drops_entries() {
        let mut log = QueryLog::new(false);
        log.push(entry("SELECT 1"));
        assert!(log.is_empty());
        log.set_enabled(true);
        log.push(entry("SELECT 2"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|e| e.sql.as_str()), Some("SELECT 2"));
    }

    #[test]
    fn entries_serialize() {
        let json = serde_json::to_value(entry("DELETE FROM t")).unwrap();
        assert_eq!(json["sql"], "DELETE FROM t");
        assert_eq!(json["params"][0], 1);
        assert!(json["error_code"].is_null());
    }
}

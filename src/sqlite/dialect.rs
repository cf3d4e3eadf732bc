use crate::dialect::{
    Dialect, PlannedStatement, normalize_by_substring, required_text, split_qualified,
    text_field, truncate_step,
};
use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::schema::{ColumnDescriptor, ColumnKind, InsertMode, KeyRole};
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, QueryAndParams, RowValues};

/// Declared-type affinity rules, in SQLite's own precedence order.
const TYPE_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("int", "integer"),
    ("char", "string"),
    ("clob", "text"),
    ("text", "text"),
    ("real", "float"),
    ("floa", "float"),
    ("doub", "float"),
    ("numeric", "float"),
    ("decimal", "float"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    fn native_type(&self, kind: &ColumnKind<'_>) -> String {
        match kind {
            ColumnKind::String(length) => format!("VARCHAR({length})"),
            ColumnKind::Text => "TEXT".to_string(),
            ColumnKind::Integer | ColumnKind::TinyInt | ColumnKind::Autoincrement => {
                "INTEGER".to_string()
            }
            ColumnKind::Float => "REAL".to_string(),
            ColumnKind::Other { kind, .. } => (*kind).to_string(),
        }
    }

    /// An `INTEGER PRIMARY KEY` already aliases the rowid, which autoincrements.
    fn key_clause(&self, role: KeyRole) -> &'static str {
        match role {
            KeyRole::None => "",
            KeyRole::Primary | KeyRole::PrimaryAutoincrement => "PRIMARY KEY",
        }
    }

    fn normalize_type(&self, native: &str) -> String {
        normalize_by_substring(native, TYPE_SUBSTITUTIONS)
    }

    fn list_tables_sql(&self) -> &'static str {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name"
    }

    fn list_tables_full_sql(&self) -> &'static str {
        "SELECT name, type, tbl_name, rootpage, sql FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name"
    }

    fn table_exists_query(&self, physical: &str) -> QueryAndParams {
        let (schema, table) = split_qualified(physical);
        let master = match schema {
            Some(schema) => format!("{}.sqlite_master", self.quote_identifier(&schema)),
            None => "sqlite_master".to_string(),
        };
        QueryAndParams::new(
            format!("SELECT COUNT(*) FROM {master} WHERE type = 'table' AND name = ?"),
            vec![RowValues::Text(table)],
        )
    }

    fn columns_query(&self, physical: &str) -> QueryAndParams {
        let (schema, table) = split_qualified(physical);
        match schema {
            Some(schema) => QueryAndParams::new(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?, ?) ORDER BY cid",
                vec![RowValues::Text(table), RowValues::Text(schema)],
            ),
            None => QueryAndParams::new(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
                vec![RowValues::Text(table)],
            ),
        }
    }

    fn describe_columns(&self, rows: &ResultSet) -> Result<Vec<ColumnDescriptor>, SqlBridgeError> {
        let pk_columns = rows
            .iter()
            .filter(|row| row.get("pk").and_then(RowValues::as_int).is_some_and(|pk| *pk > 0))
            .count();

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let native = text_field(row, "type").unwrap_or_default();
            let type_name = self.normalize_type(&native);
            let is_pk = row
                .get("pk")
                .and_then(RowValues::as_int)
                .is_some_and(|pk| *pk > 0);
            // A lone INTEGER primary key is the rowid alias.
            let key = match (is_pk, pk_columns, native.eq_ignore_ascii_case("integer")) {
                (false, _, _) => KeyRole::None,
                (true, 1, true) => KeyRole::PrimaryAutoincrement,
                (true, _, _) => KeyRole::Primary,
            };
            let not_null = row
                .get("notnull")
                .and_then(RowValues::as_int)
                .is_some_and(|flag| *flag != 0);
            columns.push(ColumnDescriptor {
                name: required_text(row, "name")?,
                type_name,
                default: text_field(row, "dflt_value").and_then(|raw| clean_default(&raw)),
                nullable: !not_null && key != KeyRole::PrimaryAutoincrement,
                extra: (key == KeyRole::PrimaryAutoincrement).then(|| "autoincrement".to_string()),
                key,
            });
        }
        Ok(columns)
    }

    fn truncate_statements(&self, physical: &str) -> Vec<PlannedStatement> {
        let (_, table) = split_qualified(physical);
        vec![
            truncate_step(format!("DELETE FROM {}", self.quote_table(physical))),
            PlannedStatement {
                statement: QueryAndParams::new(
                    "DELETE FROM sqlite_sequence WHERE name = ?",
                    vec![RowValues::Text(table)],
                ),
                requires_table: Some("sqlite_sequence"),
            },
        ]
    }

    fn insert_verb(&self, mode: InsertMode) -> &'static str {
        match mode {
            InsertMode::Insert => "INSERT INTO",
            InsertMode::Replace => "REPLACE INTO",
        }
    }
}

/// `'abc'` → `abc`, `NULL` → none, anything else as declared.
fn clean_default(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => Some(inner.replace("''", "'")),
        None => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, IndexKind, TableSchema};

    #[test]
    fn resolves_portable_types() {
        let d = SqliteDialect;
        assert_eq!(d.resolve_type("string|32"), "VARCHAR(32)");
        assert_eq!(d.resolve_type("string"), "VARCHAR(255)");
        assert_eq!(d.resolve_type("tinyint"), "INTEGER");
        assert_eq!(d.resolve_type("double"), "REAL");
        assert_eq!(d.resolve_type("increment"), "INTEGER");
        assert_eq!(d.resolve_type("datetime"), "datetime");
        assert_eq!(d.resolve_type("decimal|10,2"), "decimal(10,2)");
    }

    #[test]
    fn resolve_type_is_idempotent() {
        let d = SqliteDialect;
        for token in ["string|32", "text", "int", "tinyint", "float", "primary", "blob"] {
            let once = d.resolve_type(token);
            assert_eq!(d.resolve_type(&once), once, "{token}");
        }
    }

    #[test]
    fn create_table_clauses() {
        let d = SqliteDialect;
        let schema = TableSchema::new()
            .column("id", "increment")
            .column("station", "string|16")
            .column("temp", ColumnSpec::new("float").nullable())
            .column("note", ColumnSpec::new("text").with_default("it's"));
        assert_eq!(
            d.create_table_sql("p_status", &schema, true).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"p_status\" (\"id\" INTEGER PRIMARY KEY, \
             \"station\" VARCHAR(16) NOT NULL, \"temp\" REAL, \
             \"note\" TEXT NOT NULL DEFAULT 'it''s')"
        );
    }

    #[test]
    fn empty_schema_is_rejected() {
        let err = SqliteDialect
            .create_table_sql("t", &TableSchema::new(), false)
            .unwrap_err();
        assert!(matches!(err, SqlBridgeError::EmptyOperand(_)));
    }

    #[test]
    fn primary_key_index_becomes_unique_index() {
        let d = SqliteDialect;
        assert_eq!(
            d.add_index_sql("p_status", IndexKind::PrimaryKey, &["time", "station"])
                .unwrap(),
            "CREATE UNIQUE INDEX \"p_status_time_station\" ON \"p_status\" (\"time\", \"station\")"
        );
        assert!(d.add_index_sql("p_status", IndexKind::Index, &[]).is_err());
    }

    #[test]
    fn escapes_literals() {
        let d = SqliteDialect;
        assert_eq!(d.escape_literal(&RowValues::Text("42".into()), true), "42");
        assert_eq!(d.escape_literal(&RowValues::Text("042".into()), true), "'042'");
        assert_eq!(d.escape_literal(&RowValues::Null, true), "NULL");
        assert_eq!(d.escape_literal(&RowValues::Float(1.5), true), "1.5");
        assert_eq!(d.escape_literal(&RowValues::Text("a'b".into()), false), "a''b");
        assert_eq!(d.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn normalizes_declared_types() {
        let d = SqliteDialect;
        assert_eq!(d.normalize_type("INTEGER"), "integer");
        assert_eq!(d.normalize_type("VARCHAR(32)"), "string");
        assert_eq!(d.normalize_type("numeric"), "float");
        assert_eq!(d.normalize_type("REAL"), "float");
        assert_eq!(d.normalize_type("TEXT"), "text");
        assert_eq!(d.normalize_type("BLOB"), "blob");
    }

    #[test]
    fn truncate_clears_sequence_when_present() {
        let steps = SqliteDialect.truncate_statements("p_logs");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].statement.query, "DELETE FROM \"p_logs\"");
        assert_eq!(steps[1].requires_table, Some("sqlite_sequence"));
        assert_eq!(steps[1].statement.params, vec![RowValues::Text("p_logs".into())]);
    }

    #[test]
    fn cleans_defaults() {
        assert_eq!(clean_default("'it''s'"), Some("it's".to_string()));
        assert_eq!(clean_default("NULL"), None);
        assert_eq!(clean_default("0"), Some("0".to_string()));
    }
}

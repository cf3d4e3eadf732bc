use crate::dialect::{
    Dialect, PlannedStatement, create_index_sql, normalize_exact, required_text,
    split_qualified, text_field, truncate_step,
};
use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::schema::{ColumnDescriptor, ColumnKind, IndexKind, InsertMode, KeyRole};
use crate::translation::PlaceholderStyle;
use crate::types::{QueryAndParams, RowValues};

const TYPE_NAMES: &[(&str, &str)] = &[
    ("character varying", "string"),
    ("varchar", "string"),
    ("character", "string"),
    ("char", "string"),
    ("bpchar", "string"),
    ("integer", "integer"),
    ("int", "integer"),
    ("int4", "integer"),
    ("smallint", "integer"),
    ("int2", "integer"),
    ("bigint", "integer"),
    ("int8", "integer"),
    ("real", "float"),
    ("float4", "float"),
    ("double precision", "float"),
    ("float8", "float"),
    ("numeric", "float"),
    ("decimal", "float"),
    ("text", "text"),
];

const COLUMNS_SQL: &str = "SELECT c.column_name::text AS name, c.data_type::text AS type, \
     c.column_default::text AS dflt, c.is_nullable::text AS nullable, \
     c.is_identity::text AS identity, \
     EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
     ON kcu.constraint_name = tc.constraint_name \
     AND kcu.constraint_schema = tc.constraint_schema \
     AND kcu.table_name = tc.table_name \
     WHERE tc.constraint_type = 'PRIMARY KEY' \
     AND tc.table_schema = c.table_schema \
     AND tc.table_name = c.table_name \
     AND kcu.column_name = c.column_name) AS pk \
     FROM information_schema.columns c";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn database_type(&self) -> crate::types::DatabaseType {
        crate::types::DatabaseType::Postgres
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    fn native_type(&self, kind: &ColumnKind<'_>) -> String {
        match kind {
            ColumnKind::String(length) => format!("VARCHAR({length})"),
            ColumnKind::Text => "TEXT".to_string(),
            ColumnKind::Integer | ColumnKind::Autoincrement => "INTEGER".to_string(),
            ColumnKind::TinyInt => "SMALLINT".to_string(),
            ColumnKind::Float => "DOUBLE PRECISION".to_string(),
            ColumnKind::Other { kind, .. } => (*kind).to_string(),
        }
    }

    fn key_clause(&self, role: KeyRole) -> &'static str {
        match role {
            KeyRole::None => "",
            KeyRole::Primary => "PRIMARY KEY",
            KeyRole::PrimaryAutoincrement => "GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
        }
    }

    fn normalize_type(&self, native: &str) -> String {
        normalize_exact(native, TYPE_NAMES)
    }

    fn list_tables_sql(&self) -> &'static str {
        "SELECT table_name::text AS name FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
    }

    // information_schema domains don't decode as text without the casts.
    fn list_tables_full_sql(&self) -> &'static str {
        "SELECT table_name::text AS name, table_catalog::text AS table_catalog, \
         table_schema::text AS table_schema, table_type::text AS table_type, \
         is_insertable_into::text AS is_insertable_into \
         FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
    }

    /// Resolved through `to_regclass`, so quoting and schema qualification follow the server's
    /// own name lookup.
    fn table_exists_query(&self, physical: &str) -> QueryAndParams {
        QueryAndParams::new(
            "SELECT COUNT(*) FROM pg_catalog.pg_class \
             WHERE oid = to_regclass(?) AND relkind IN ('r', 'p')",
            vec![RowValues::Text(self.quote_table(physical))],
        )
    }

    fn columns_query(&self, physical: &str) -> QueryAndParams {
        let (schema, table) = split_qualified(physical);
        match schema {
            Some(schema) => QueryAndParams::new(
                format!(
                    "{COLUMNS_SQL} WHERE c.table_schema = ? AND c.table_name = ? \
                     ORDER BY c.ordinal_position"
                ),
                vec![RowValues::Text(schema), RowValues::Text(table)],
            ),
            None => QueryAndParams::new(
                format!(
                    "{COLUMNS_SQL} WHERE c.table_schema = current_schema() AND c.table_name = ? \
                     ORDER BY c.ordinal_position"
                ),
                vec![RowValues::Text(table)],
            ),
        }
    }

    fn describe_columns(&self, rows: &ResultSet) -> Result<Vec<ColumnDescriptor>, SqlBridgeError> {
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_default = text_field(row, "dflt");
            let sequence_backed = raw_default
                .as_deref()
                .is_some_and(|d| d.trim_start().starts_with("nextval("));
            let identity = text_field(row, "identity").is_some_and(|v| v == "YES");
            let is_pk = row
                .get("pk")
                .and_then(RowValues::as_bool)
                .unwrap_or(false);
            let key = match (is_pk, identity || sequence_backed) {
                (false, _) => KeyRole::None,
                (true, true) => KeyRole::PrimaryAutoincrement,
                (true, false) => KeyRole::Primary,
            };
            columns.push(ColumnDescriptor {
                name: required_text(row, "name")?,
                type_name: self.normalize_type(&text_field(row, "type").unwrap_or_default()),
                default: if sequence_backed {
                    None
                } else {
                    raw_default.as_deref().and_then(clean_default)
                },
                nullable: text_field(row, "nullable").is_some_and(|v| v == "YES"),
                extra: (identity || sequence_backed).then(|| "autoincrement".to_string()),
                key,
            });
        }
        Ok(columns)
    }

    fn truncate_statements(&self, physical: &str) -> Vec<PlannedStatement> {
        vec![truncate_step(format!(
            "TRUNCATE TABLE {} RESTART IDENTITY",
            self.quote_table(physical)
        ))]
    }

    /// Primary-key requests add a real primary key constraint.
    fn add_index_sql(
        &self,
        physical: &str,
        kind: IndexKind,
        fields: &[&str],
    ) -> Result<String, SqlBridgeError> {
        if kind != IndexKind::PrimaryKey || fields.is_empty() {
            return create_index_sql(self, physical, kind, fields);
        }
        let columns: Vec<String> = fields.iter().map(|f| self.quote_identifier(f)).collect();
        Ok(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.quote_table(physical),
            columns.join(", ")
        ))
    }

    fn replace_needs_primary_key(&self) -> bool {
        true
    }

    /// Replace becomes an upsert on the primary key; tables without one get a plain insert.
    fn conflict_clause(
        &self,
        mode: InsertMode,
        columns: &[&str],
        primary_key: &[String],
    ) -> Option<String> {
        if mode != InsertMode::Replace || primary_key.is_empty() {
            return None;
        }
        let target: Vec<String> = primary_key
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !primary_key.iter().any(|pk| pk == *c))
            .map(|c| {
                let quoted = self.quote_identifier(c);
                format!("{quoted} = EXCLUDED.{quoted}")
            })
            .collect();
        if updates.is_empty() {
            Some(format!(" ON CONFLICT ({}) DO NOTHING", target.join(", ")))
        } else {
            Some(format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                target.join(", "),
                updates.join(", ")
            ))
        }
    }
}

/// `'abc'::character varying` → `abc`, `NULL::text` → none, `42` → `42`.
fn clean_default(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.starts_with('\'') {
        if let Some(end) = value.rfind('\'').filter(|end| *end > 0) {
            return Some(value[1..end].replace("''", "'"));
        }
    }
    let mut value = value.split("::").next().unwrap_or_default().trim();
    if let Some(stripped) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        value = stripped.trim();
    }
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(value.to_string())
    }
}

//! Per-backend SQL generation.
//!
//! A [`Dialect`] turns portable declarations into backend SQL text. It never touches a
//! connection: the session runs what it produces. Provided methods hold the behaviour both
//! shipped backends share; implementations override the points where they diverge.

use std::fmt;

use crate::error::SqlBridgeError;
use crate::naming::is_verbatim;
use crate::results::ResultSet;
use crate::schema::{
    ColumnDefault, ColumnDescriptor, ColumnKind, ColumnSpec, IndexKind, InsertMode, KeyRole,
    TableSchema,
};
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, QueryAndParams, RowValues};

/// One statement of a multi-step operation, optionally skipped when a table is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    pub statement: QueryAndParams,
    /// Run only when this table exists.
    pub requires_table: Option<&'static str>,
}

impl PlannedStatement {
    fn always(statement: QueryAndParams) -> Self {
        Self {
            statement,
            requires_table: None,
        }
    }
}

pub trait Dialect: fmt::Debug + Send + Sync {
    fn database_type(&self) -> DatabaseType;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Native type for a recognised kind. `Other` kinds never reach this.
    fn native_type(&self, kind: &ColumnKind<'_>) -> String;

    /// Key syntax following the type in a column clause.
    fn key_clause(&self, role: KeyRole) -> &'static str;

    /// Map a backend type name to the canonical vocabulary.
    fn normalize_type(&self, native: &str) -> String;

    /// Statement listing user tables; one text column.
    fn list_tables_sql(&self) -> &'static str;

    /// Like [`Dialect::list_tables_sql`], but with every catalog column after `name`.
    fn list_tables_full_sql(&self) -> &'static str;

    /// Statement whose first column of the first row counts matching tables.
    fn table_exists_query(&self, physical: &str) -> QueryAndParams;

    /// Statement describing the columns of a table.
    fn columns_query(&self, physical: &str) -> QueryAndParams;

    /// Convert the rows of [`Dialect::columns_query`] into descriptors.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ExecutionError` when a metadata row is missing a field.
    fn describe_columns(&self, rows: &ResultSet) -> Result<Vec<ColumnDescriptor>, SqlBridgeError>;

    fn truncate_statements(&self, physical: &str) -> Vec<PlannedStatement>;

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote a resolved table name unless it is already quoted or qualified.
    fn quote_table(&self, physical: &str) -> String {
        if is_verbatim(physical) {
            physical.to_string()
        } else {
            self.quote_identifier(physical)
        }
    }

    /// Literal for statements that cannot take bound parameters (DDL defaults).
    ///
    /// Canonical integer text and numbers come back unquoted, `Null` as `NULL`, anything else
    /// single-quoted with embedded quotes doubled (or just escaped when `quoted` is false).
    fn escape_literal(&self, value: &RowValues, quoted: bool) -> String {
        let quote = |text: &str| {
            let escaped = text.replace('\'', "''");
            if quoted {
                format!("'{escaped}'")
            } else {
                escaped
            }
        };
        if let Some(number) = value.integer_text() {
            return number.to_string();
        }
        match value {
            RowValues::Null => "NULL".to_string(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) if f.is_finite() => format!("{f:?}"),
            RowValues::Float(f) => quote(&f.to_string()),
            RowValues::Text(s) => quote(s),
        }
    }

    /// Resolve a `kind` / `kind|length` token to the backend column type.
    ///
    /// Unknown kinds pass through as `kind` or `kind(length)`; resolving an already-resolved
    /// type returns it unchanged.
    fn resolve_type(&self, token: &str) -> String {
        match ColumnKind::parse(token) {
            ColumnKind::Other { kind, length: None } => kind.to_string(),
            ColumnKind::Other {
                kind,
                length: Some(length),
            } => format!("{kind}({length})"),
            known => self.native_type(&known),
        }
    }

    fn column_clause(&self, name: &str, spec: &ColumnSpec) -> String {
        let mut clause = format!(
            "{} {}",
            self.quote_identifier(name),
            self.resolve_type(spec.kind())
        );
        let key = self.key_clause(spec.key());
        if !key.is_empty() {
            clause.push(' ');
            clause.push_str(key);
        }
        match spec.default_value() {
            ColumnDefault::Required => clause.push_str(" NOT NULL"),
            ColumnDefault::Nullable => {}
            ColumnDefault::Value(value) => {
                clause.push_str(" NOT NULL DEFAULT ");
                clause.push_str(&self.escape_literal(value, true));
            }
        }
        clause
    }

    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` when `schema` has no columns.
    fn create_table_sql(
        &self,
        physical: &str,
        schema: &TableSchema,
        if_not_exists: bool,
    ) -> Result<String, SqlBridgeError> {
        if schema.is_empty() {
            return Err(SqlBridgeError::EmptyOperand(format!(
                "create_table {physical} without columns"
            )));
        }
        let columns: Vec<String> = schema
            .iter()
            .map(|(name, spec)| self.column_clause(name, spec))
            .collect();
        Ok(format!(
            "CREATE TABLE {}{} ({})",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.quote_table(physical),
            columns.join(", ")
        ))
    }

    fn drop_table_sql(&self, physical: &str, if_exists: bool) -> String {
        format!(
            "DROP TABLE {}{}",
            if if_exists { "IF EXISTS " } else { "" },
            self.quote_table(physical)
        )
    }

    /// Added columns are NOT NULL only when they carry a default.
    fn add_column_sql(&self, physical: &str, name: &str, spec: &ColumnSpec) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_table(physical),
            self.quote_identifier(name),
            self.resolve_type(spec.kind())
        );
        let key = self.key_clause(spec.key());
        if !key.is_empty() {
            sql.push(' ');
            sql.push_str(key);
        }
        if let ColumnDefault::Value(value) = spec.default_value() {
            sql.push_str(" NOT NULL DEFAULT ");
            sql.push_str(&self.escape_literal(value, true));
        }
        sql
    }

    fn drop_column_sql(&self, physical: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_table(physical),
            self.quote_identifier(name)
        )
    }

    /// # Errors
    /// Returns `SqlBridgeError::EmptyOperand` when `fields` is empty.
    fn add_index_sql(
        &self,
        physical: &str,
        kind: IndexKind,
        fields: &[&str],
    ) -> Result<String, SqlBridgeError> {
        create_index_sql(self, physical, kind, fields)
    }

    fn insert_verb(&self, _mode: InsertMode) -> &'static str {
        "INSERT INTO"
    }

    /// Whether `InsertMode::Replace` needs the table's primary key to build its statement.
    fn replace_needs_primary_key(&self) -> bool {
        false
    }

    /// Trailing clause that turns an insert into a replace.
    fn conflict_clause(
        &self,
        _mode: InsertMode,
        _columns: &[&str],
        _primary_key: &[String],
    ) -> Option<String> {
        None
    }
}

/// `CREATE [UNIQUE] INDEX`; primary-key requests become unique indexes.
///
/// # Errors
/// Returns `SqlBridgeError::EmptyOperand` when `fields` is empty.
pub fn create_index_sql<D: Dialect + ?Sized>(
    dialect: &D,
    physical: &str,
    kind: IndexKind,
    fields: &[&str],
) -> Result<String, SqlBridgeError> {
    if fields.is_empty() {
        return Err(SqlBridgeError::EmptyOperand(format!(
            "{kind} on {physical} without fields"
        )));
    }
    let columns: Vec<String> = fields.iter().map(|f| dialect.quote_identifier(f)).collect();
    let verb = match kind {
        IndexKind::Index => "CREATE INDEX",
        IndexKind::Unique | IndexKind::PrimaryKey => "CREATE UNIQUE INDEX",
    };
    Ok(format!(
        "{verb} {} ON {} ({})",
        dialect.quote_identifier(&index_name(physical, fields)),
        dialect.quote_table(physical),
        columns.join(", ")
    ))
}

/// `<table>_<field>_<field>`, with quotes and schema dots flattened away.
#[must_use]
pub fn index_name(physical: &str, fields: &[&str]) -> String {
    let table = unquoted_name(physical).replace('.', "_");
    let mut name = table;
    for field in fields {
        name.push('_');
        name.push_str(field);
    }
    name
}

/// Strip identifier quoting (`"a"."b"` → `a.b`).
#[must_use]
pub fn unquoted_name(physical: &str) -> String {
    physical.chars().filter(|c| *c != '"' && *c != '`').collect()
}

/// Split an optionally schema-qualified name into `(schema, table)`, unquoted.
#[must_use]
pub fn split_qualified(physical: &str) -> (Option<String>, String) {
    let plain = unquoted_name(physical);
    match plain.rsplit_once('.') {
        Some((schema, table)) => (Some(schema.to_string()), table.to_string()),
        None => (None, plain),
    }
}

/// Canonical name by case-insensitive substring rules, first match wins.
pub(crate) fn normalize_by_substring(native: &str, rules: &[(&str, &str)]) -> String {
    let lower = native.trim().to_ascii_lowercase();
    rules
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map_or(lower, |(_, canonical)| (*canonical).to_string())
}

/// Canonical name by exact type-name match (length suffix ignored).
pub(crate) fn normalize_exact(native: &str, rules: &[(&str, &str)]) -> String {
    let lower = native.trim().to_ascii_lowercase();
    let base = lower.split('(').next().unwrap_or_default().trim();
    rules
        .iter()
        .find(|(name, _)| *name == base)
        .map_or(lower.clone(), |(_, canonical)| (*canonical).to_string())
}

pub(crate) fn text_field(row: &crate::results::ResultRow, column: &str) -> Option<String> {
    match row.get(column)? {
        RowValues::Null => None,
        other => Some(other.to_string()),
    }
}

pub(crate) fn required_text(
    row: &crate::results::ResultRow,
    column: &str,
) -> Result<String, SqlBridgeError> {
    text_field(row, column).ok_or_else(|| {
        SqlBridgeError::ExecutionError(format!("column metadata row is missing {column}"))
    })
}

pub(crate) fn truncate_step(sql: String) -> PlannedStatement {
    PlannedStatement::always(QueryAndParams::new_without_params(sql))
}

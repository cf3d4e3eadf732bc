//! Declarative column and table descriptions.
//!
//! A [`TableSchema`] is what application code hands to `Database::create_table`; a
//! [`ColumnDescriptor`] is what introspection hands back. Both are backend-neutral.

mod field_spec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// Key role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    PrimaryAutoincrement,
}

impl KeyRole {
    /// Role from the field-spec flag: `1` primary key, `2` autoincrementing primary key.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::InvalidFieldSpec` for any other flag.
    pub fn from_flag(flag: i64) -> Result<Self, SqlBridgeError> {
        match flag {
            0 => Ok(KeyRole::None),
            1 => Ok(KeyRole::Primary),
            2 => Ok(KeyRole::PrimaryAutoincrement),
            other => Err(SqlBridgeError::InvalidFieldSpec(format!(
                "unknown key role flag {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_primary(self) -> bool {
        !matches!(self, KeyRole::None)
    }
}

/// Default clause of a declared column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnDefault {
    /// NOT NULL without a default (a bare field-spec string).
    #[default]
    Required,
    /// Nullable without a default (an explicit `null` default).
    Nullable,
    /// NOT NULL with this default.
    Value(RowValues),
}

/// One declared column: type token, default and key role.
///
/// The type token is the portable `kind` / `kind|length` form, resolved per backend by
/// `Dialect::resolve_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    kind: String,
    default: ColumnDefault,
    key: KeyRole,
}

impl ColumnSpec {
    /// A NOT NULL column without a default.
    ///
    /// `primary` and `increment` kinds always become nullable autoincrementing primary keys.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            default: ColumnDefault::Required,
            key: KeyRole::None,
        }
        .normalized()
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.default = ColumnDefault::Nullable;
        self.normalized()
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<RowValues>) -> Self {
        self.default = match value.into() {
            RowValues::Null => ColumnDefault::Nullable,
            value => ColumnDefault::Value(value),
        };
        self.normalized()
    }

    #[must_use]
    pub fn with_key(mut self, key: KeyRole) -> Self {
        self.key = key;
        self.normalized()
    }

    #[must_use]
    pub fn primary_key(self) -> Self {
        self.with_key(KeyRole::Primary)
    }

    #[must_use]
    pub fn autoincrement(self) -> Self {
        self.with_key(KeyRole::PrimaryAutoincrement)
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn default_value(&self) -> &ColumnDefault {
        &self.default
    }

    #[must_use]
    pub fn key(&self) -> KeyRole {
        self.key
    }

    /// Parse a field spec: a `"kind|length"` string or a `[kind, default, flag]` array.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::InvalidFieldSpec` for malformed input.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SqlBridgeError> {
        field_spec::parse_column(value)
    }

    fn normalized(mut self) -> Self {
        if ColumnKind::parse(&self.kind).is_autoincrement() {
            self.key = KeyRole::PrimaryAutoincrement;
            self.default = ColumnDefault::Nullable;
        } else if self.key == KeyRole::PrimaryAutoincrement {
            self.default = ColumnDefault::Nullable;
        }
        self
    }
}

impl FromStr for ColumnSpec {
    type Err = SqlBridgeError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        field_spec::validate_token(token)?;
        Ok(ColumnSpec::new(token))
    }
}

impl From<&str> for ColumnSpec {
    fn from(token: &str) -> Self {
        ColumnSpec::new(token)
    }
}

/// Parsed `kind|length` type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind<'a> {
    String(&'a str),
    Text,
    Integer,
    TinyInt,
    Float,
    /// `primary` or `increment`
    Autoincrement,
    /// Anything else; passed through to the backend.
    Other {
        kind: &'a str,
        length: Option<&'a str>,
    },
}

impl<'a> ColumnKind<'a> {
    pub const DEFAULT_STRING_LENGTH: &'static str = "255";

    #[must_use]
    pub fn parse(token: &'a str) -> Self {
        let token = token.trim();
        let (kind, length) = match token.split_once('|') {
            Some((kind, length)) => (kind.trim(), Some(length.trim())),
            None => (token, None),
        };
        match kind.to_ascii_lowercase().as_str() {
            "string" => ColumnKind::String(
                length
                    .filter(|len| !len.is_empty())
                    .unwrap_or(Self::DEFAULT_STRING_LENGTH),
            ),
            "text" => ColumnKind::Text,
            "int" | "integer" => ColumnKind::Integer,
            "tinyint" => ColumnKind::TinyInt,
            "float" | "double" => ColumnKind::Float,
            "primary" | "increment" => ColumnKind::Autoincrement,
            _ => ColumnKind::Other { kind, length },
        }
    }

    #[must_use]
    pub fn is_autoincrement(&self) -> bool {
        matches!(self, ColumnKind::Autoincrement)
    }
}

/// Ordered list of column declarations for `create_table`.
///
/// ```rust
/// use sql_bridge::schema::{ColumnSpec, TableSchema};
///
/// let schema = TableSchema::new()
///     .column("id", "increment")
///     .column("station", "string|32")
///     .column("temp", ColumnSpec::new("float").nullable());
/// assert_eq!(schema.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    columns: Vec<(String, ColumnSpec)>,
}

impl TableSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A column declared twice keeps its first position and the latest spec.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, spec: impl Into<ColumnSpec>) -> Self {
        self.push(name, spec);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, spec: impl Into<ColumnSpec>) {
        let name = name.into();
        let spec = spec.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = spec,
            None => self.columns.push((name, spec)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnSpec)> {
        self.columns.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Names of the primary-key columns, in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, spec)| spec.key().is_primary())
            .map(|(name, _)| name)
            .collect()
    }

    /// Parse a JSON object of field specs, keeping the object's key order.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::InvalidFieldSpec` for malformed input.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SqlBridgeError> {
        field_spec::parse_table(value)
    }

    /// Parse a JSON document of field specs.
    ///
    /// ```rust
    /// use sql_bridge::schema::{KeyRole, TableSchema};
    ///
    /// let schema = TableSchema::from_json_str(
    ///     r#"{"id": ["int", null, 1], "station": "string|32", "note": ["text", null]}"#,
    /// )?;
    /// assert_eq!(schema.primary_key(), vec!["id"]);
    /// # Ok::<(), sql_bridge::SqlBridgeError>(())
    /// ```
    ///
    /// # Errors
    /// Returns `SqlBridgeError::Json` when the text is not JSON and
    /// `SqlBridgeError::InvalidFieldSpec` for malformed specs.
    pub fn from_json_str(text: &str) -> Result<Self, SqlBridgeError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }
}

impl<N: Into<String>, S: Into<ColumnSpec>> FromIterator<(N, S)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (N, S)>>(iter: I) -> Self {
        let mut schema = TableSchema::new();
        for (name, spec) in iter {
            schema.push(name, spec);
        }
        schema
    }
}

/// Canonical column metadata returned by introspection.
///
/// `type_name` is one of `string`, `integer`, `float`, `text`, or the lower-cased native type
/// when it has no canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub default: Option<String>,
    #[serde(rename = "null")]
    pub nullable: bool,
    pub key: KeyRole,
    pub extra: Option<String>,
}

/// Index flavour for `add_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Index,
    Unique,
    PrimaryKey,
}

impl FromStr for IndexKind {
    type Err = SqlBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "index" => Ok(IndexKind::Index),
            "unique" | "unique index" => Ok(IndexKind::Unique),
            "primary" | "primary key" => Ok(IndexKind::PrimaryKey),
            _ => Err(SqlBridgeError::ParameterError(format!(
                "unknown index kind {s:?}"
            ))),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexKind::Index => "index",
            IndexKind::Unique => "unique",
            IndexKind::PrimaryKey => "primary key",
        })
    }
}

/// Flags for `create_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateOptions {
    pub if_not_exists: bool,
    /// Drop an existing table of the same name first.
    pub drop_first: bool,
}

impl CreateOptions {
    #[must_use]
    pub fn if_not_exists() -> Self {
        Self {
            if_not_exists: true,
            drop_first: false,
        }
    }

    #[must_use]
    pub fn recreate() -> Self {
        Self {
            if_not_exists: false,
            drop_first: true,
        }
    }
}

/// Insert behaviour on key conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    #[default]
    Insert,
    /// Replace the conflicting row.
    Replace,
}

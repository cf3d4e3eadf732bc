use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlBridgeError;

/// Values that can be stored in a database row or used as query parameters.
///
/// Reuse the same enum across backends so helper functions do not need to branch on driver
/// types:
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValues {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
}

/// One row of column → value pairs. Iteration order is the sorted column order,
/// which is also the column order of generated statements.
pub type RowMap = BTreeMap<String, RowValues>;

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Floats as-is; integers widen.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_int() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        }
    }

    /// Text holding a canonical integer (`"42"`, not `"042"` or `"+42"`).
    #[must_use]
    pub fn integer_text(&self) -> Option<i64> {
        let text = self.as_text()?;
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let parsed: i64 = text.parse().ok()?;
        (parsed.to_string() == text).then_some(parsed)
    }

    /// The value as it should be bound: canonical integer text binds as an integer,
    /// everything else binds as itself.
    #[must_use]
    pub fn into_bind_value(self) -> RowValues {
        match self.integer_text() {
            Some(parsed) => RowValues::Int(parsed),
            None => self,
        }
    }

    /// Convert a decoded JSON value. Booleans become 0/1, nested arrays and objects
    /// are kept as their JSON text.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> RowValues {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Int(i64::from(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s.clone()),
            other => RowValues::Text(other.to_string()),
        }
    }

    /// Text form used as a map key by keyed fetches.
    #[must_use]
    pub fn key_string(&self) -> String {
        match self {
            RowValues::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Null => f.write_str("NULL"),
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Build a [`RowMap`] from a decoded JSON object, e.g. an ingestion payload.
///
/// # Errors
/// Returns `SqlBridgeError::ParameterError` when `value` is not a JSON object.
pub fn row_from_json(value: &JsonValue) -> Result<RowMap, SqlBridgeError> {
    let JsonValue::Object(map) = value else {
        return Err(SqlBridgeError::ParameterError(format!(
            "expected a JSON object for a row, got {value}"
        )));
    };
    Ok(map
        .iter()
        .map(|(k, v)| (k.clone(), RowValues::from_json(v)))
        .collect())
}

/// Shorthand for building a [`RowMap`]:
/// ```rust
/// use sql_bridge::row;
///
/// let r = row! { "time" => 1, "station" => "A" };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::types::RowMap::new() };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut map = $crate::types::RowMap::new();
        $( map.insert(::std::string::String::from($col), $crate::types::RowValues::from($val)); )+
        map
    }};
}

/// Statement parameters, either positional (`?`) or named (`:name`).
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<RowValues>),
    /// Names may be given with or without the leading `:`.
    Named(Vec<(String, RowValues)>),
}

impl Params {
    #[must_use]
    pub fn none() -> Self {
        Params::Positional(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Positional(values) => values.is_empty(),
            Params::Named(pairs) => pairs.is_empty(),
        }
    }

    /// Values in declaration order, for logging.
    #[must_use]
    pub fn values(&self) -> Vec<RowValues> {
        match self {
            Params::Positional(values) => values.clone(),
            Params::Named(pairs) => pairs.iter().map(|(_, v)| v.clone()).collect(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::none()
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::none()
    }
}

impl From<Vec<RowValues>> for Params {
    fn from(values: Vec<RowValues>) -> Self {
        Params::Positional(values)
    }
}

impl From<&[RowValues]> for Params {
    fn from(values: &[RowValues]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl<const N: usize> From<[RowValues; N]> for Params {
    fn from(values: [RowValues; N]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl From<&RowMap> for Params {
    fn from(map: &RowMap) -> Self {
        Params::Named(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// A query and its parameters bundled together
///
/// Builders return this so generated statements can be inspected or logged before they run.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}

/// The database type supported by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` server
    Postgres,
    /// `SQLite` file or in-memory database
    Sqlite,
}

impl DatabaseType {
    /// Driver name as reported by `Database::driver_name`.
    #[must_use]
    pub fn driver_name(self) -> &'static str {
        match self {
            DatabaseType::Postgres => "pgsql",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    #[must_use]
    pub fn is_compiled_in(self) -> bool {
        match self {
            DatabaseType::Postgres => cfg!(feature = "postgres"),
            DatabaseType::Sqlite => cfg!(feature = "sqlite"),
        }
    }
}

/// Backends compiled into this build.
#[must_use]
pub fn available_drivers() -> Vec<DatabaseType> {
    [DatabaseType::Postgres, DatabaseType::Sqlite]
        .into_iter()
        .filter(|db_type| db_type.is_compiled_in())
        .collect()
}

/// What a failed statement does to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Return the error.
    #[default]
    Throw,
    /// Return `Ok(None)`; the failure is kept in the session's error state and the log.
    Silent,
}

/// Per-call options for executor paths.
///
/// # Examples
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let options = QueryOptions::default().with_error_mode(ErrorMode::Silent);
/// assert_eq!(options.resolve_error_mode(ErrorMode::Throw), ErrorMode::Silent);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// `None` follows the session default.
    pub error_mode: Option<ErrorMode>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = Some(error_mode);
        self
    }

    #[must_use]
    pub fn resolve_error_mode(self, session_default: ErrorMode) -> ErrorMode {
        self.error_mode.unwrap_or(session_default)
    }
}

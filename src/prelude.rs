//! Convenient imports for common functionality.
//!
//! This module re-exports the types most sessions need.

pub use crate::row;

pub use crate::config::ConnectOptions;
pub use crate::dialect::Dialect;
pub use crate::driver::ExecOutcome;
pub use crate::error::SqlBridgeError;
pub use crate::executor::{Database, LastError, QueryBuilder, QueryLog, QueryLogEntry};
pub use crate::results::{KeyedRows, ResultRow, ResultSet};
pub use crate::schema::{
    ColumnDefault, ColumnDescriptor, ColumnSpec, CreateOptions, IndexKind, InsertMode, KeyRole,
    TableSchema,
};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{
    DatabaseType, ErrorMode, Params, QueryAndParams, QueryOptions, RowMap, RowValues,
    available_drivers, row_from_json,
};

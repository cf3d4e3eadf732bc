//! One schema and query API over PostgreSQL and SQLite.
//!
//! Portable column types, schema introspection, parameterized row writes and a per-session
//! query log, with the backend picked at connect time.
//!
//! ```rust,no_run
//! use sql_bridge::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlBridgeError> {
//! let mut db = Database::connect(ConnectOptions::sqlite("solar.db").with_prefix("p_")).await?;
//! let schema = TableSchema::from_json_str(r#"{"time": "int", "station": "string|16"}"#)?;
//! db.create_table("status", &schema, CreateOptions::if_not_exists()).await?;
//! db.insert(
//!     "status",
//!     &[row! { "time" => 1, "station" => "A" }, row! { "time" => 2, "station" => "A" }],
//!     InsertMode::Insert,
//! )
//! .await?;
//! let latest = db
//!     .scalar("SELECT MAX(time) FROM {status} WHERE station = ?", vec![RowValues::from("A")])
//!     .await?;
//! assert_eq!(latest, Some(RowValues::Int(2)));
//! # Ok(()) }
//! ```

pub mod config;
mod ddl;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod executor;
mod introspect;
pub mod mutation;
pub mod naming;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::ConnectOptions;
pub use driver::{DatabaseExecutor, ExecOutcome};
pub use error::SqlBridgeError;
pub use executor::{Database, LastError, QueryBuilder, QueryLog, QueryLogEntry};
pub use results::{KeyedRows, ResultRow, ResultSet};
pub use types::{
    DatabaseType, ErrorMode, Params, QueryAndParams, QueryOptions, RowMap, RowValues,
    available_drivers, row_from_json,
};

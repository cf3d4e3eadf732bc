// SQLite module - the embedded file-based backend
//
// This module is split into several sub-modules:
// - config: Opening the database file and preparing the connection
// - dialect: SQLite SQL generation and metadata normalization
// - functions: MySQL-compatibility SQL functions registered on every connection
// - params: Parameter conversion between RowValues and SQLite values
// - query: Result extraction and building
// - executor: Statement execution on the blocking pool

pub mod config;
pub mod dialect;
pub mod executor;
mod functions;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::{SqliteTarget, resolve_database_path};
pub use dialect::SqliteDialect;
pub use executor::SqliteExecutor;
pub use query::build_result_set;

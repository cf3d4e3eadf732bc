// PostgreSQL module - the server-based backend
//
// This module is split into several sub-modules:
// - config: Connection configuration and the background connection task
// - dialect: PostgreSQL SQL generation and metadata normalization
// - params: Parameter conversion between RowValues and PostgreSQL types
// - query: Result extraction and building
// - executor: Statement execution

pub mod config;
pub mod dialect;
pub mod executor;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::split_host_port;
pub use dialect::PostgresDialect;
pub use executor::PostgresExecutor;
pub use params::Params;
pub use query::{PgNumeric, build_result_set};

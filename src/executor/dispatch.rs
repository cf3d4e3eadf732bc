use crate::config::ConnectOptions;
use crate::driver::DatabaseExecutor;
use crate::error::SqlBridgeError;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;

/// Open a driver for the backend named in `options`.
///
/// # Errors
/// Returns `SqlBridgeError::ConfigError` for invalid options or a backend that is not compiled
/// in, and `SqlBridgeError::ConnectionError` when the backend cannot be reached.
pub(crate) async fn open_driver(
    options: &ConnectOptions,
) -> Result<Box<dyn DatabaseExecutor>, SqlBridgeError> {
    options.validate()?;
    match options.db_type {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => Ok(Box::new(postgres::config::connect(options).await?)),
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => Ok(Box::new(sqlite::config::connect(options).await?)),
        #[allow(unreachable_patterns)]
        other => Err(SqlBridgeError::ConfigError(format!(
            "{} support is not enabled in the current build",
            other.driver_name()
        ))),
    }
}

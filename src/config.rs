use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlBridgeError;
use crate::types::{DatabaseType, ErrorMode};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_query_logging() -> bool {
    true
}

/// Everything needed to open a session.
///
/// # Examples
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let options = ConnectOptions::sqlite("solar.db")
///     .with_prefix("p_")
///     .with_root_dir("/srv/solar")
///     .with_error_mode(ErrorMode::Silent);
/// assert_eq!(options.db_type, DatabaseType::Sqlite);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub db_type: DatabaseType,
    /// Server host, optionally `host:port`. Unused by `SQLite`.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Database name, or the file name / `:memory:` for `SQLite`.
    #[serde(default)]
    pub database: String,
    /// Prepended to every logical table name.
    #[serde(default)]
    pub prefix: String,
    /// Directory relative `SQLite` database names are resolved against.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub error_mode: ErrorMode,
    #[serde(default = "default_query_logging")]
    pub query_logging: bool,
}

impl ConnectOptions {
    fn with_type(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            host: String::new(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            prefix: String::new(),
            root_dir: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            error_mode: ErrorMode::default(),
            query_logging: true,
        }
    }

    #[must_use]
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::with_type(DatabaseType::Sqlite)
        }
    }

    #[must_use]
    pub fn postgres(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            ..Self::with_type(DatabaseType::Postgres)
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    #[must_use]
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    #[must_use]
    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.query_logging = enabled;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Check the options before any connection attempt.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` when the backend is not compiled in or a field it
    /// needs is empty.
    pub fn validate(&self) -> Result<(), SqlBridgeError> {
        if !self.db_type.is_compiled_in() {
            return Err(SqlBridgeError::ConfigError(format!(
                "{} support is not compiled in (enable the `{}` feature)",
                self.db_type.driver_name(),
                match self.db_type {
                    DatabaseType::Postgres => "postgres",
                    DatabaseType::Sqlite => "sqlite",
                }
            )));
        }
        let required = match self.db_type {
            DatabaseType::Postgres => vec![
                ("host", self.host.as_str()),
                ("user", self.user.as_str()),
                ("database", self.database.as_str()),
            ],
            // an empty name opens an in-memory database
            DatabaseType::Sqlite => Vec::new(),
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SqlBridgeError::ConfigError(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("prefix", &self.prefix)
            .field("root_dir", &self.root_dir)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("error_mode", &self.error_mode)
            .field("query_logging", &self.query_logging)
            .finish()
    }
}

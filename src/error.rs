use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A statement failed to prepare or execute. `code` is the backend's own
    /// error code (SQLite extended result code, PostgreSQL SQLSTATE).
    #[error("Statement error [{code}]: {message}")]
    Statement { code: String, message: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Empty operand: {0}")]
    EmptyOperand(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Invalid field spec: {0}")]
    InvalidFieldSpec(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlBridgeError {
    /// Backend code and message for failures that belong in the session's
    /// error state. Connection and configuration failures have no code.
    #[must_use]
    pub fn code_and_message(&self) -> (String, String) {
        match self {
            #[cfg(feature = "sqlite")]
            SqlBridgeError::SqliteError(err) => sqlite_code_and_message(err),
            #[cfg(feature = "postgres")]
            SqlBridgeError::PostgresError(err) => postgres_code_and_message(err),
            SqlBridgeError::Statement { code, message } => (code.clone(), message.clone()),
            other => (String::from("HY000"), other.to_string()),
        }
    }

    /// Collapse a raw driver error into the structured `Statement` form.
    #[must_use]
    pub fn into_statement_error(self) -> SqlBridgeError {
        match self {
            #[cfg(feature = "sqlite")]
            SqlBridgeError::SqliteError(_) => {
                let (code, message) = self.code_and_message();
                SqlBridgeError::Statement { code, message }
            }
            #[cfg(feature = "postgres")]
            SqlBridgeError::PostgresError(ref err) if err.is_closed() => {
                SqlBridgeError::ConnectionError(format!("postgres connection closed: {err}"))
            }
            #[cfg(feature = "postgres")]
            SqlBridgeError::PostgresError(_) => {
                let (code, message) = self.code_and_message();
                SqlBridgeError::Statement { code, message }
            }
            other => other,
        }
    }
}

#[cfg(feature = "sqlite")]
fn sqlite_code_and_message(err: &rusqlite::Error) -> (String, String) {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, msg) => (
            ffi_err.extended_code.to_string(),
            msg.clone().unwrap_or_else(|| ffi_err.to_string()),
        ),
        other => (String::from("HY000"), other.to_string()),
    }
}

#[cfg(feature = "postgres")]
fn postgres_code_and_message(err: &tokio_postgres::Error) -> (String, String) {
    match err.as_db_error() {
        Some(db_err) => (db_err.code().code().to_string(), db_err.message().to_string()),
        None => (
            err.code()
                .map_or_else(|| String::from("08000"), |state| state.code().to_string()),
            err.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_error_displays_code() {
        let err = SqlBridgeError::Statement {
            code: "42P01".into(),
            message: "relation \"nope\" does not exist".into(),
        };
        assert_eq!(
            err.to_string(),
            "Statement error [42P01]: relation \"nope\" does not exist"
        );
        assert_eq!(err.code_and_message().0, "42P01");
    }

    #[test]
    fn non_statement_errors_use_generic_code() {
        let err = SqlBridgeError::EmptyOperand("no fields".into());
        let (code, message) = err.code_and_message();
        assert_eq!(code, "HY000");
        assert!(message.contains("no fields"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_failures_become_statement_errors() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let raw = conn.execute("SELEC 1", []).unwrap_err();
        let err = SqlBridgeError::from(raw).into_statement_error();
        match err {
            SqlBridgeError::Statement { code, message } => {
                assert_eq!(code, "1");
                assert!(message.contains("syntax error"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

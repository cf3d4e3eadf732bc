use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

use crate::config::ConnectOptions;
use crate::error::SqlBridgeError;

use super::executor::SqliteExecutor;
use super::functions;

/// Where an `SQLite` session keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl SqliteTarget {
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            SqliteTarget::Memory => ":memory:".to_string(),
            SqliteTarget::File(path) => path.display().to_string(),
        }
    }
}

/// Resolve the configured database name.
///
/// `:memory:` (or an empty name) stays in memory. Absolute paths are used as given. A relative
/// name is anchored at `root_dir` by its file name, so `data/solar.db` with root `/srv` opens
/// `/srv/solar.db`; without a root it is used relative to the working directory.
#[must_use]
pub fn resolve_database_path(database: &str, root_dir: Option<&Path>) -> SqliteTarget {
    let database = database.trim();
    if database.is_empty() || database == ":memory:" {
        return SqliteTarget::Memory;
    }
    let path = Path::new(database);
    if path.is_absolute() {
        return SqliteTarget::File(path.to_path_buf());
    }
    match (root_dir, path.file_name()) {
        (Some(root), Some(file_name)) => SqliteTarget::File(root.join(file_name)),
        _ => SqliteTarget::File(path.to_path_buf()),
    }
}

/// Open the database described by `options` and prepare the connection.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` if the file cannot be opened or set up.
pub async fn connect(options: &ConnectOptions) -> Result<SqliteExecutor, SqlBridgeError> {
    let target = resolve_database_path(&options.database, options.root_dir.as_deref());
    let busy_timeout = options.connect_timeout();
    let open_target = target.clone();

    let conn = spawn_blocking(move || open_connection(&open_target, busy_timeout))
        .await
        .map_err(|e| {
            SqlBridgeError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
        })?
        .map_err(|e| {
            SqlBridgeError::ConnectionError(format!(
                "cannot open sqlite database {}: {e}",
                target.display()
            ))
        })?;

    Ok(SqliteExecutor::new(Arc::new(Mutex::new(conn)), target))
}

fn open_connection(target: &SqliteTarget, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = match target {
        SqliteTarget::Memory => Connection::open_in_memory()?,
        SqliteTarget::File(path) => Connection::open(path)?,
    };
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
    functions::register(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_targets() {
        assert_eq!(resolve_database_path(":memory:", None), SqliteTarget::Memory);
        assert_eq!(resolve_database_path("", Some(Path::new("/srv"))), SqliteTarget::Memory);
    }

    #[test]
    fn relative_names_anchor_at_root_by_file_name() {
        assert_eq!(
            resolve_database_path("data/solar.db", Some(Path::new("/srv/app"))),
            SqliteTarget::File(PathBuf::from("/srv/app/solar.db"))
        );
        assert_eq!(
            resolve_database_path("solar.db", None),
            SqliteTarget::File(PathBuf::from("solar.db"))
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        assert_eq!(
            resolve_database_path("/var/lib/solar.db", Some(Path::new("/srv"))),
            SqliteTarget::File(PathBuf::from("/var/lib/solar.db"))
        );
    }
}

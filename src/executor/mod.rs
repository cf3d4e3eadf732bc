//! The session: one live connection plus counters and the query log.
//!
//! Every public operation funnels through one pipeline that rewrites `{table}` tokens,
//! binds parameters in the backend's placeholder syntax, executes, records the outcome and
//! applies the error mode.

mod builder;
mod dispatch;
mod log;

pub use builder::QueryBuilder;
pub use log::{LastError, QueryLog, QueryLogEntry};

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::time::{Duration, Instant};

use crate::config::ConnectOptions;
use crate::dialect::Dialect;
use crate::driver::{DatabaseExecutor, ExecOutcome};
use crate::error::SqlBridgeError;
use crate::naming::{physical_table_name, rewrite_table_tokens};
use crate::results::{KeyedRows, ResultRow, ResultSet};
use crate::translation::bind_placeholders;
use crate::types::{DatabaseType, ErrorMode, Params, QueryOptions, RowValues, available_drivers};

use self::log::caller_string;

#[derive(Debug, Default)]
struct Counters {
    query_count: u64,
    exec_time: Duration,
    affected_rows: u64,
    insert_id: i64,
    last_error: Option<LastError>,
}

/// Error mode and provenance of one public call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite {
    pub(crate) error_mode: ErrorMode,
    pub(crate) caller: &'static Location<'static>,
}

#[derive(Debug, Clone, Copy)]
enum Expect {
    Rows,
    Exec,
}

enum Completed {
    Rows(ResultSet),
    Exec(ExecOutcome),
}

/// A session against one backend.
///
/// ```rust,no_run
/// use sql_bridge::prelude::*;
///
/// # async fn demo() -> Result<(), SqlBridgeError> {
/// let mut db = Database::connect(ConnectOptions::sqlite(":memory:").with_prefix("p_")).await?;
/// db.create_table(
///     "status",
///     &TableSchema::new().column("time", "int").column("station", "string|16"),
///     CreateOptions::if_not_exists(),
/// )
/// .await?;
/// db.insert_row("status", &row! { "time" => 1, "station" => "A" }, InsertMode::Insert)
///     .await?;
/// let rows = db
///     .fetch_all("SELECT * FROM {status} WHERE station = ?", vec![RowValues::from("A")])
///     .await?
///     .unwrap_or_default();
/// assert_eq!(rows.len(), 1);
/// # Ok(()) }
/// ```
pub struct Database {
    options: ConnectOptions,
    driver: Box<dyn DatabaseExecutor>,
    counters: Counters,
    log: QueryLog,
    next_options: Option<QueryOptions>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("options", &self.options)
            .field("driver", &self.driver)
            .field("counters", &self.counters)
            .field("logged", &self.log.len())
            .finish()
    }
}

impl Database {
    /// Open a session.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` for invalid options and
    /// `SqlBridgeError::ConnectionError` when the backend cannot be reached.
    pub async fn connect(options: ConnectOptions) -> Result<Database, SqlBridgeError> {
        let driver = dispatch::open_driver(&options).await?;
        tracing::info!(
            driver = driver.database_type().driver_name(),
            database = %options.database,
            prefix = %options.prefix,
            "database session opened"
        );
        Ok(Database {
            log: QueryLog::new(options.query_logging),
            options,
            driver,
            counters: Counters::default(),
            next_options: None,
        })
    }

    /// Replace the connection with a fresh one using the same options.
    ///
    /// Counters and the log are kept. On failure the old connection stays in place.
    ///
    /// # Errors
    /// Same as [`Database::connect`].
    pub async fn reconnect(&mut self) -> Result<(), SqlBridgeError> {
        let driver = dispatch::open_driver(&self.options).await?;
        self.swap_driver(driver).await;
        Ok(())
    }

    /// Reconnect with new options (another backend, database or prefix).
    ///
    /// # Errors
    /// Same as [`Database::connect`].
    pub async fn reconnect_with(&mut self, options: ConnectOptions) -> Result<(), SqlBridgeError> {
        let driver = dispatch::open_driver(&options).await?;
        self.log.set_enabled(options.query_logging);
        self.options = options;
        self.swap_driver(driver).await;
        Ok(())
    }

    async fn swap_driver(&mut self, driver: Box<dyn DatabaseExecutor>) {
        let mut previous = std::mem::replace(&mut self.driver, driver);
        if let Err(e) = previous.close().await {
            tracing::warn!(error = %e, "closing the previous connection failed");
        }
        tracing::info!(
            driver = self.driver.database_type().driver_name(),
            database = %self.options.database,
            "database session reconnected"
        );
    }

    /// Release the connection. Later statements fail with `ConnectionError`.
    ///
    /// # Errors
    /// Returns the backend's error if closing fails.
    pub async fn close(&mut self) -> Result<(), SqlBridgeError> {
        self.driver.close().await?;
        tracing::info!(
            driver = self.driver.database_type().driver_name(),
            queries = self.counters.query_count,
            "database session closed"
        );
        Ok(())
    }

    /// Execute a statement and return the affected row count and generated id.
    ///
    /// # Errors
    /// In throwing mode, returns `SqlBridgeError::Statement` when the backend rejects the
    /// statement and `SqlBridgeError::ParameterError` when parameters cannot be bound. Silent
    /// mode returns `Ok(None)` instead.
    #[track_caller]
    pub fn execute(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
    ) -> impl Future<Output = Result<Option<ExecOutcome>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let params = params.into();
        async move { self.run_exec(sql, params, call).await }
    }

    /// First row of the result, `None` when there is none.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn fetch_one(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
    ) -> impl Future<Output = Result<Option<ResultRow>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let params = params.into();
        async move { self.run_fetch_one(sql, params, call).await }
    }

    /// All rows of the result.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn fetch_all(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
    ) -> impl Future<Output = Result<Option<ResultSet>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let params = params.into();
        async move { self.run_select(sql, params, call).await }
    }

    /// All rows keyed by the text form of their first column; later rows win on duplicates.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn fetch_keyed(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
    ) -> impl Future<Output = Result<Option<KeyedRows>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let params = params.into();
        async move {
            Ok(self
                .run_select(sql, params, call)
                .await?
                .map(ResultSet::into_keyed))
        }
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn scalar(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
    ) -> impl Future<Output = Result<Option<RowValues>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        let params = params.into();
        async move { self.run_scalar(sql, params, call).await }
    }

    /// Run a script of several statements without parameters. `{table}` tokens are rewritten.
    ///
    /// # Errors
    /// As [`Database::execute`].
    #[track_caller]
    pub fn execute_batch(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Option<()>, SqlBridgeError>> {
        let call = self.next_call_site(Location::caller());
        async move { self.run_batch(sql, call).await }
    }

    /// Start a fluent builder for one statement.
    ///
    /// ```rust,no_run
    /// use sql_bridge::prelude::*;
    ///
    /// # async fn demo(db: &mut Database) -> Result<(), SqlBridgeError> {
    /// let count = db
    ///     .query("SELECT COUNT(*) FROM {status} WHERE station = :station")
    ///     .named([("station", "A")])
    ///     .error_mode(ErrorMode::Silent)
    ///     .scalar()
    ///     .await?;
    /// # let _ = count;
    /// # Ok(()) }
    /// ```
    #[track_caller]
    pub fn query<'q>(&mut self, sql: &'q str) -> QueryBuilder<'_, 'q> {
        QueryBuilder::new(self, sql, Location::caller())
    }

    /// Backend driver name (`pgsql` or `sqlite`).
    #[must_use]
    pub fn driver_name(&self) -> &'static str {
        self.driver.database_type().driver_name()
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.driver.database_type()
    }

    /// Backends compiled into this build.
    #[must_use]
    pub fn available_drivers() -> Vec<DatabaseType> {
        available_drivers()
    }

    /// Version string reported by the server or library.
    ///
    /// # Errors
    /// Returns the backend's error if the version query fails.
    pub async fn server_version(&mut self) -> Result<String, SqlBridgeError> {
        self.driver.server_version().await
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.driver.dialect()
    }

    #[must_use]
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    /// Physical name of a logical table, the same one a `{name}` token resolves to.
    /// Quoted and schema-qualified names are used as given.
    #[must_use]
    pub fn table_name(&self, name: &str) -> String {
        physical_table_name(&self.options.prefix, name)
    }

    /// Statements executed, failures included.
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.counters.query_count
    }

    /// Cumulative time spent executing statements.
    #[must_use]
    pub fn exec_time(&self) -> Duration {
        self.counters.exec_time
    }

    /// Rows affected by the last data-modifying statement; 0 after a query or failure.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.counters.affected_rows
    }

    /// Id generated by the last insert; 0 when it generated none.
    #[must_use]
    pub fn insert_id(&self) -> i64 {
        self.counters.insert_id
    }

    /// Error of the last call, cleared by the next successful statement.
    #[must_use]
    pub fn last_error(&self) -> Option<&LastError> {
        self.counters.last_error.as_ref()
    }

    #[must_use]
    pub fn query_log(&self) -> &QueryLog {
        &self.log
    }

    pub fn clear_query_log(&mut self) {
        self.log.clear();
    }

    pub fn set_query_logging(&mut self, enabled: bool) {
        self.options.query_logging = enabled;
        self.log.set_enabled(enabled);
    }

    #[must_use]
    pub fn error_mode(&self) -> ErrorMode {
        self.options.error_mode
    }

    /// Change the session default; per-call `QueryOptions` still override it.
    pub fn set_error_mode(&mut self, error_mode: ErrorMode) {
        self.options.error_mode = error_mode;
    }

    /// Apply `options` to the next operation only, whichever it is.
    ///
    /// ```rust,no_run
    /// use sql_bridge::prelude::*;
    ///
    /// # async fn demo(db: &mut Database) -> Result<(), SqlBridgeError> {
    /// let silent = QueryOptions::default().with_error_mode(ErrorMode::Silent);
    /// let created = db
    ///     .with_options(silent)
    ///     .add_column_if_not_exists("status", "note", "text")
    ///     .await?;
    /// # let _ = created;
    /// # Ok(()) }
    /// ```
    pub fn with_options(&mut self, options: QueryOptions) -> &mut Self {
        self.next_options = Some(options);
        self
    }

    /// Call site for a public operation, consuming any pending [`Database::with_options`].
    pub(crate) fn next_call_site(&mut self, caller: &'static Location<'static>) -> CallSite {
        let options = self.next_options.take().unwrap_or_default();
        self.call_site(options, caller)
    }

    pub(crate) fn call_site(
        &self,
        options: QueryOptions,
        caller: &'static Location<'static>,
    ) -> CallSite {
        CallSite {
            error_mode: options.resolve_error_mode(self.options.error_mode),
            caller,
        }
    }

    pub(crate) async fn run_exec(
        &mut self,
        sql: &str,
        params: Params,
        call: CallSite,
    ) -> Result<Option<ExecOutcome>, SqlBridgeError> {
        Ok(match self.run(sql, params, Expect::Exec, call).await? {
            Some(Completed::Exec(outcome)) => Some(outcome),
            _ => None,
        })
    }

    pub(crate) async fn run_select(
        &mut self,
        sql: &str,
        params: Params,
        call: CallSite,
    ) -> Result<Option<ResultSet>, SqlBridgeError> {
        Ok(match self.run(sql, params, Expect::Rows, call).await? {
            Some(Completed::Rows(rows)) => Some(rows),
            _ => None,
        })
    }

    pub(crate) async fn run_fetch_one(
        &mut self,
        sql: &str,
        params: Params,
        call: CallSite,
    ) -> Result<Option<ResultRow>, SqlBridgeError> {
        Ok(self
            .run_select(sql, params, call)
            .await?
            .and_then(|rows| rows.results.into_iter().next()))
    }

    pub(crate) async fn run_scalar(
        &mut self,
        sql: &str,
        params: Params,
        call: CallSite,
    ) -> Result<Option<RowValues>, SqlBridgeError> {
        Ok(self
            .run_fetch_one(sql, params, call)
            .await?
            .and_then(|row| row.get_by_index(0).cloned()))
    }

    pub(crate) async fn run_batch(
        &mut self,
        sql: &str,
        call: CallSite,
    ) -> Result<Option<()>, SqlBridgeError> {
        let sql = rewrite_table_tokens(sql, &self.options.prefix);
        let started = Instant::now();
        let result = self.driver.execute_batch(&sql).await;
        let elapsed = started.elapsed();
        match result {
            Ok(()) => {
                self.record_success(&sql, Vec::new(), elapsed, None, call);
                Ok(Some(()))
            }
            Err(err) => self.record_failure(&sql, Vec::new(), elapsed, err, call),
        }
    }

    async fn run(
        &mut self,
        sql: &str,
        params: Params,
        expect: Expect,
        call: CallSite,
    ) -> Result<Option<Completed>, SqlBridgeError> {
        let sql = rewrite_table_tokens(sql, &self.options.prefix);
        let style = self.driver.dialect().placeholder_style();
        let bound = match bind_placeholders(&sql, params, style) {
            Ok(bound) => bound,
            Err(err) => return self.reject(err, call),
        };

        let started = Instant::now();
        let result = match expect {
            Expect::Rows => self
                .driver
                .execute_select(&bound.sql, &bound.params)
                .await
                .map(Completed::Rows),
            Expect::Exec => self
                .driver
                .execute_dml(&bound.sql, &bound.params)
                .await
                .map(Completed::Exec),
        };
        let elapsed = started.elapsed();

        match result {
            Ok(completed) => {
                self.record_success(&bound.sql, bound.params, elapsed, Some(&completed), call);
                Ok(Some(completed))
            }
            Err(err) => self.record_failure(&bound.sql, bound.params, elapsed, err, call),
        }
    }

    fn record_success(
        &mut self,
        sql: &str,
        params: Vec<RowValues>,
        elapsed: Duration,
        completed: Option<&Completed>,
        call: CallSite,
    ) {
        let (affected_rows, fetched_rows, insert_id) = match completed {
            Some(Completed::Rows(rows)) => (0, rows.len(), 0),
            Some(Completed::Exec(outcome)) => (outcome.affected_rows, 0, outcome.last_insert_id),
            None => (0, 0, 0),
        };
        self.counters.query_count += 1;
        self.counters.exec_time += elapsed;
        self.counters.affected_rows = affected_rows;
        self.counters.insert_id = insert_id;
        self.counters.last_error = None;

        tracing::debug!(
            target: "sql_bridge::query",
            sql,
            params = ?params,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            affected = affected_rows,
            fetched = fetched_rows,
            "statement executed"
        );

        self.log.push(QueryLogEntry {
            sql: sql.to_string(),
            params,
            duration: elapsed,
            error_code: None,
            error_message: None,
            affected_rows,
            fetched_rows,
            insert_id,
            caller: caller_string(call.caller),
        });
    }

    fn record_failure<T>(
        &mut self,
        sql: &str,
        params: Vec<RowValues>,
        elapsed: Duration,
        err: SqlBridgeError,
        call: CallSite,
    ) -> Result<Option<T>, SqlBridgeError> {
        let err = err.into_statement_error();
        let (code, message) = err.code_and_message();
        self.counters.query_count += 1;
        self.counters.exec_time += elapsed;
        self.counters.affected_rows = 0;
        self.counters.insert_id = 0;

        tracing::warn!(
            target: "sql_bridge::query",
            sql,
            code = %code,
            error = %message,
            caller = %call.caller,
            "statement failed"
        );

        self.log.push(QueryLogEntry {
            sql: sql.to_string(),
            params,
            duration: elapsed,
            error_code: Some(code),
            error_message: Some(message),
            affected_rows: 0,
            fetched_rows: 0,
            insert_id: 0,
            caller: caller_string(call.caller),
        });
        self.reject(err, call)
    }

    /// Record `err` as the session error, then raise it or swallow it per the error mode.
    pub(crate) fn reject<T>(
        &mut self,
        err: SqlBridgeError,
        call: CallSite,
    ) -> Result<Option<T>, SqlBridgeError> {
        let (code, message) = err.code_and_message();
        self.counters.last_error = Some(LastError { code, message });
        match call.error_mode {
            ErrorMode::Throw => Err(err),
            ErrorMode::Silent => {
                tracing::debug!(error = %err, caller = %call.caller, "error suppressed by silent mode");
                Ok(None)
            }
        }
    }
}

use std::panic::Location;

use crate::driver::ExecOutcome;
use crate::error::SqlBridgeError;
use crate::results::{KeyedRows, ResultRow, ResultSet};
use crate::types::{ErrorMode, Params, QueryOptions, RowValues};

use super::Database;

/// Fluent builder for one statement, created by [`Database::query`].
pub struct QueryBuilder<'db, 'q> {
    db: &'db mut Database,
    sql: &'q str,
    params: Params,
    options: QueryOptions,
    caller: &'static Location<'static>,
}

impl<'db, 'q> QueryBuilder<'db, 'q> {
    pub(crate) fn new(
        db: &'db mut Database,
        sql: &'q str,
        caller: &'static Location<'static>,
    ) -> Self {
        let options = db.next_options.take().unwrap_or_default();
        Self {
            db,
            sql,
            params: Params::none(),
            options,
            caller,
        }
    }

    /// Positional parameters for `?` placeholders.
    #[must_use]
    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    /// Named parameters for `:name` placeholders.
    #[must_use]
    pub fn named<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        self.params = Params::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Override the session error mode for this statement only.
    #[must_use]
    pub fn error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.options.error_mode = Some(error_mode);
        self
    }

    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// # Errors
    /// As [`Database::execute`].
    pub async fn execute(self) -> Result<Option<ExecOutcome>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        self.db.run_exec(self.sql, self.params, call).await
    }

    /// # Errors
    /// As [`Database::execute`].
    pub async fn fetch_one(self) -> Result<Option<ResultRow>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        self.db.run_fetch_one(self.sql, self.params, call).await
    }

    /// # Errors
    /// As [`Database::execute`].
    pub async fn fetch_all(self) -> Result<Option<ResultSet>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        self.db.run_select(self.sql, self.params, call).await
    }

    /// # Errors
    /// As [`Database::execute`].
    pub async fn fetch_keyed(self) -> Result<Option<KeyedRows>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        Ok(self
            .db
            .run_select(self.sql, self.params, call)
            .await?
            .map(ResultSet::into_keyed))
    }

    /// # Errors
    /// As [`Database::execute`].
    pub async fn scalar(self) -> Result<Option<RowValues>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        self.db.run_scalar(self.sql, self.params, call).await
    }

    /// Run the statement as a parameterless script.
    ///
    /// # Errors
    /// As [`Database::execute`].
    pub async fn batch(self) -> Result<Option<()>, SqlBridgeError> {
        let call = self.db.call_site(self.options, self.caller);
        self.db.run_batch(self.sql, call).await
    }
}

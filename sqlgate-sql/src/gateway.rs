use std::fmt;

use sqlgate_connection::{Connection, Cursor, SqlParam, Statement};
use sqlgate_result::{Error, Result};

use crate::buffer::ResultBuffer;
use crate::classify::{PermissionPolicy, StatementCategory};
use crate::columns::{Column, ColumnFactory, ColumnKind};
use crate::config::GatewayConfig;
use crate::matcher::ValueMatcher;
use crate::poll::{PollOutcome, Poller};

/// Row counts are never probed beyond this; two rows already decide every
/// polled condition.
const PROBE_CAP: usize = 2;

/// A polled row-count expectation.
struct RowCountCondition {
    failure: &'static str,
    expected: &'static str,
    holds: fn(usize) -> bool,
}

fn is_zero(count: usize) -> bool {
    count == 0
}

fn is_positive(count: usize) -> bool {
    count > 0
}

fn is_one(count: usize) -> bool {
    count == 1
}

const EMPTY: RowCountCondition = RowCountCondition {
    failure: "Query returned at least one row of data",
    expected: "row count == 0",
    holds: is_zero,
};

const NON_EMPTY: RowCountCondition = RowCountCondition {
    failure: "Query returned no rows of data",
    expected: "row count > 0",
    holds: is_positive,
};

const SINGLE_ROW: RowCountCondition = RowCountCondition {
    failure: "Query returned zero rows, or more than one row of data",
    expected: "row count == 1",
    holds: is_one,
};

fn describe_count(count: Option<usize>) -> String {
    match count {
        None => "no completed evaluation".to_string(),
        Some(0) => "0 rows".to_string(),
        Some(1) => "1 row".to_string(),
        Some(n) => format!("at least {n} rows"),
    }
}

/// Re-wrap a backend execution failure with the gateway operation that hit
/// it. Other errors pass through unchanged.
fn with_context(err: Error, context: &str) -> Error {
    match err {
        err @ Error::Execution { .. } => Error::execution(context, err),
        other => other,
    }
}

/// Policy-gated access to one open connection.
///
/// Every statement goes through the same pipeline: classify, check the
/// permission policy, open a plain or prepared statement, bind parameters
/// by 1-based position, execute, and release the statement on every exit
/// path. Queries are captured into detached [`ResultBuffer`]s.
///
/// The gateway owns its connection for its whole lifetime; use
/// [`SqlGateway::into_connection`] to take it back.
pub struct SqlGateway<C: Connection> {
    connection: C,
    config: GatewayConfig,
    policy: PermissionPolicy,
    columns: ColumnFactory,
}

impl<C: Connection> SqlGateway<C> {
    pub fn new(connection: C, config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let policy = config.policy();
        tracing::debug!(
            "[GATEWAY] open {} backend={} dml_enabled={} ddl_enabled={} poll_timeout={:?}",
            connection.description(),
            connection.backend(),
            config.dml_enabled,
            config.ddl_enabled,
            config.poll_timeout
        );
        Ok(Self {
            connection,
            config,
            policy,
            columns: ColumnFactory::new(),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    pub fn description(&self) -> String {
        format!("SqlGateway({})", self.connection.description())
    }

    /// Factory for the column accessors this gateway reads.
    pub fn columns(&self) -> &ColumnFactory {
        &self.columns
    }

    /// Build the error a caller raises after finding the system under test
    /// in an unexpected state.
    pub fn report_invalid_state(&self, message: impl Into<String>) -> Error {
        Error::InvalidState(message.into())
    }

    // -----------------------------------------------------------------
    // Statement pipeline
    // -----------------------------------------------------------------

    fn authorize(&self, sql: &str) -> Result<StatementCategory> {
        let category = self.policy.authorize(sql)?;
        tracing::trace!("[GATEWAY] {category} statement permitted");
        Ok(category)
    }

    fn open_statement(&self, sql: &str, params: &[SqlParam]) -> Result<C::Statement<'_>> {
        let mut stmt = if params.is_empty() {
            self.connection.create_statement(sql)?
        } else {
            self.connection.prepare_statement(sql)?
        };
        for (idx, param) in params.iter().enumerate() {
            stmt.bind(idx + 1, param)?;
        }
        Ok(stmt)
    }

    fn capture(&self, sql: &str, params: &[SqlParam]) -> Result<ResultBuffer> {
        let mut stmt = self.open_statement(sql, params)?;
        let mut cursor = stmt.execute_query()?;
        let buffer = ResultBuffer::capture(&mut cursor, self.connection.backend())?;
        Ok(buffer)
    }

    fn execute_update(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let mut stmt = self.open_statement(sql, params)?;
        stmt.execute_update()
    }

    // Fetches at least one row so execution-time failures surface even for
    // a cap of zero, and never more than max(stop_at, 1).
    fn fetch_count(&self, sql: &str, stop_at: usize, params: &[SqlParam]) -> Result<usize> {
        let mut stmt = self.open_statement(sql, params)?;
        let mut cursor = stmt.execute_query()?;
        if cursor.next_row()?.is_none() || stop_at == 0 {
            return Ok(0);
        }
        let mut count = 1;
        while count < stop_at && cursor.next_row()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Run a query and capture all of its rows.
    pub fn query(&self, sql: &str, params: &[SqlParam]) -> Result<ResultBuffer> {
        let category = self.authorize(sql)?;
        tracing::debug!("[GATEWAY] query category={category} params={}", params.len());
        let buffer = self
            .capture(sql, params)
            .map_err(|err| with_context(err, "Could not execute query in database"))?;
        tracing::debug!("[GATEWAY] query returned {} row(s)", buffer.row_count());
        Ok(buffer)
    }

    pub fn insert(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.insert_update_delete(sql, params, "insert")
    }

    pub fn update(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.insert_update_delete(sql, params, "update")
    }

    pub fn delete(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.insert_update_delete(sql, params, "delete")
    }

    /// Shared path of [`Self::insert`], [`Self::update`] and [`Self::delete`].
    /// `label` only changes the error context; any permitted statement runs.
    fn insert_update_delete(&self, sql: &str, params: &[SqlParam], label: &str) -> Result<u64> {
        let category = self.authorize(sql)?;
        tracing::debug!(
            "[GATEWAY] {label} category={category} params={}",
            params.len()
        );
        let affected = self
            .execute_update(sql, params)
            .map_err(|err| with_context(err, &format!("Could not execute {label} in database")))?;
        tracing::debug!("[GATEWAY] {label} affected {affected} row(s)");
        Ok(affected)
    }

    /// Count the rows of a query, fetching no more than `stop_at`.
    pub fn count_rows(&self, sql: &str, stop_at: usize, params: &[SqlParam]) -> Result<usize> {
        self.authorize(sql)?;
        let count = self
            .fetch_count(sql, stop_at, params)
            .map_err(|err| with_context(err, "Could not execute query"))?;
        tracing::trace!("[GATEWAY] counted {count} row(s), cap {stop_at}");
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Typed value access
    // -----------------------------------------------------------------

    /// Read `column` from the 1-based row `row_num` of `buffer`.
    ///
    /// `Ok(None)` is SQL NULL. The buffer must have been captured by this
    /// gateway's backend.
    pub fn get_column_value<K: ColumnKind>(
        &self,
        buffer: &ResultBuffer,
        row_num: usize,
        column: &Column<K>,
    ) -> Result<Option<K::Value>> {
        if buffer.backend() != self.connection.backend() {
            return Err(Error::type_mismatch(format!(
                "Result buffer was captured by backend '{}', not by this gateway's '{}' backend",
                buffer.backend(),
                self.connection.backend()
            )));
        }
        let row_count = buffer.row_count();
        if row_num == 0 || row_num > row_count {
            return Err(Error::OutOfBounds {
                requested: row_num,
                row_count,
            });
        }
        let mut cursor = buffer.cursor();
        cursor.before_first();
        for _ in 0..row_num {
            cursor.advance();
        }
        cursor.read(column)
    }

    /// Check a value against `matcher`.
    pub fn value_matches<K, M>(
        &self,
        buffer: &ResultBuffer,
        row_num: usize,
        column: &Column<K>,
        matcher: &M,
    ) -> Result<bool>
    where
        K: ColumnKind,
        M: ValueMatcher<K::Value> + ?Sized,
    {
        let value = self.get_column_value(buffer, row_num, column)?;
        Ok(matcher.matches(value.as_ref()))
    }

    /// Like [`Self::value_matches`], failing with [`Error::ValueMismatch`].
    pub fn assert_value_matches<K, M>(
        &self,
        buffer: &ResultBuffer,
        row_num: usize,
        column: &Column<K>,
        matcher: &M,
    ) -> Result<()>
    where
        K: ColumnKind,
        M: ValueMatcher<K::Value> + ?Sized,
    {
        let value = self.get_column_value(buffer, row_num, column)?;
        if matcher.matches(value.as_ref()) {
            return Ok(());
        }
        Err(Error::ValueMismatch {
            row: row_num,
            column: column.name().to_string(),
            value: match value {
                Some(v) => format!("{v:?}"),
                None => "NULL".to_string(),
            },
            matcher: matcher.to_string(),
        })
    }

    // -----------------------------------------------------------------
    // Checks: report Ok(false) instead of failing on execution errors
    // -----------------------------------------------------------------

    // One row is enough to tell empty from non-empty.
    fn check(&self, sql: &str, params: &[SqlParam], holds: fn(usize) -> bool) -> Result<bool> {
        match self.count_rows(sql, 1, params) {
            Ok(count) => Ok(holds(count)),
            Err(Error::Execution { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Whether the query executes. Permission errors are still returned.
    pub fn is_valid_query(&self, sql: &str, params: &[SqlParam]) -> Result<bool> {
        match self.count_rows(sql, 0, params) {
            Ok(_) => Ok(true),
            Err(Error::Execution { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    pub fn is_empty_query(&self, sql: &str, params: &[SqlParam]) -> Result<bool> {
        self.check(sql, params, EMPTY.holds)
    }

    pub fn is_non_empty_query(&self, sql: &str, params: &[SqlParam]) -> Result<bool> {
        self.check(sql, params, NON_EMPTY.holds)
    }

    // -----------------------------------------------------------------
    // Assertions: poll until the condition holds or the timeout elapses
    // -----------------------------------------------------------------

    pub fn assert_valid_query(&self, sql: &str, params: &[SqlParam]) -> Result<()> {
        match self.count_rows(sql, 0, params) {
            Ok(_) => Ok(()),
            Err(err @ Error::Execution { .. }) => Err(Error::execution("Query is not valid", err)),
            Err(other) => Err(other),
        }
    }

    pub fn assert_empty_query(&self, sql: &str, params: &[SqlParam]) -> Result<()> {
        self.wait_for_row_count(sql, params, &EMPTY)
    }

    pub fn assert_non_empty_query(&self, sql: &str, params: &[SqlParam]) -> Result<()> {
        self.wait_for_row_count(sql, params, &NON_EMPTY)
    }

    pub fn assert_single_row_query(&self, sql: &str, params: &[SqlParam]) -> Result<()> {
        self.wait_for_row_count(sql, params, &SINGLE_ROW)
    }

    fn wait_for_row_count(
        &self,
        sql: &str,
        params: &[SqlParam],
        condition: &RowCountCondition,
    ) -> Result<()> {
        // Refuse forbidden statements before the first evaluation.
        self.authorize(sql)?;
        tracing::debug!(
            "[GATEWAY] waiting for {} (timeout {:?})",
            condition.expected,
            self.config.poll_timeout
        );

        let mut last_count = None;
        let outcome = Poller::from_config(&self.config).run(|| {
            let count = self.count_rows(sql, PROBE_CAP, params)?;
            last_count = Some(count);
            Ok((condition.holds)(count).then_some(()))
        });

        match outcome {
            PollOutcome::Succeeded { .. } => Ok(()),
            PollOutcome::TimedOut { elapsed, .. } => Err(Error::condition_timeout(
                condition.failure,
                condition.expected,
                describe_count(last_count),
                elapsed,
            )),
            PollOutcome::Failed { error, .. } => Err(error),
        }
    }
}

impl<C: Connection> fmt::Debug for SqlGateway<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlGateway")
            .field("connection", &self.connection.description())
            .field("backend", &self.connection.backend())
            .field("config", &self.config)
            .finish()
    }
}

use sqlgate_result::Result;

use crate::param::SqlParam;
use crate::value::SqlValue;

/// An already-open database connection.
///
/// The connection's lifecycle (driver loading, credentials, pooling and the
/// final close) belongs to the caller. Statements obtained here borrow the
/// connection and release their driver resources when dropped, so every exit
/// path of a caller, including `?` early returns, finalizes them.
pub trait Connection {
    type Statement<'conn>: Statement
    where
        Self: 'conn;

    /// Stable label of the backend implementation. Result buffers record it
    /// so a buffer captured by one backend is never read through another.
    fn backend(&self) -> &'static str;

    /// Human-readable description of what this connection points at.
    fn description(&self) -> String;

    /// Statement executed as-is, without parameter binding. Executing it
    /// fails if the text still contains placeholders.
    fn create_statement(&self, sql: &str) -> Result<Self::Statement<'_>>;

    /// Statement whose placeholders are bound through [`Statement::bind`]
    /// before execution.
    fn prepare_statement(&self, sql: &str) -> Result<Self::Statement<'_>>;
}

pub trait Statement {
    type Cursor<'stmt>: Cursor
    where
        Self: 'stmt;

    /// Number of positional placeholders in the statement text.
    fn parameter_count(&self) -> usize;

    /// Bind `param` at the 1-based position `index`.
    fn bind(&mut self, index: usize, param: &SqlParam) -> Result<()>;

    fn execute_query(&mut self) -> Result<Self::Cursor<'_>>;

    /// Execute a statement that returns no rows and report the number of
    /// affected rows (zero for DDL).
    fn execute_update(&mut self) -> Result<u64>;
}

/// Forward-only row cursor over an executing query.
pub trait Cursor {
    fn column_names(&self) -> &[String];

    /// Advance to the next row. Returns `None` once the result set is
    /// exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>>;
}

//! SQLite backend built on `rusqlite`.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{Null, ValueRef};
use sqlgate_result::{Error, Result};

use crate::param::SqlParam;
use crate::temporal::{format_date, format_time, format_timestamp};
use crate::traits::{Connection, Cursor, Statement};
use crate::value::SqlValue;

pub const SQLITE_BACKEND: &str = "sqlite";

/// Default time a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteConnection {
    conn: rusqlite::Connection,
    description: String,
}

impl SqliteConnection {
    /// Wrap a connection opened elsewhere.
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            description: "sqlite database".to_string(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)
            .map_err(|err| Error::execution("Could not connect to database", err))?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(|err| Error::execution("Could not configure database connection", err))?;
        Ok(Self {
            conn,
            description: format!("sqlite database at {}", path.display()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|err| Error::execution("Could not connect to database", err))?;
        Ok(Self {
            conn,
            description: "in-memory sqlite database".to_string(),
        })
    }

    /// Access the underlying driver connection, e.g. to seed fixtures
    /// without going through the permission policy.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn into_inner(self) -> rusqlite::Connection {
        self.conn
    }

    /// Close the connection, surfacing any error the driver reports.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| Error::execution("Could not close database connection", err))
    }
}

impl Connection for SqliteConnection {
    type Statement<'conn>
        = SqliteStatement<'conn>
    where
        Self: 'conn;

    fn backend(&self) -> &'static str {
        SQLITE_BACKEND
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn create_statement(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        SqliteStatement::prepare(&self.conn, sql, false)
    }

    fn prepare_statement(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        SqliteStatement::prepare(&self.conn, sql, true)
    }
}

/// A prepared SQLite statement. Dropping it finalizes the statement.
pub struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    parameterized: bool,
    bound: Vec<bool>,
}

impl<'conn> SqliteStatement<'conn> {
    fn prepare(conn: &'conn rusqlite::Connection, sql: &str, parameterized: bool) -> Result<Self> {
        tracing::trace!("[SQLITE] prepare parameterized={parameterized} sql={sql}");
        let stmt = conn
            .prepare(sql)
            .map_err(|err| Error::execution("failed to prepare statement", err))?;
        let bound = vec![false; stmt.parameter_count()];
        Ok(Self {
            stmt,
            parameterized,
            bound,
        })
    }

    /// Refuse to run with placeholders that were never bound; SQLite would
    /// otherwise read them as NULL.
    fn ensure_bound(&self) -> Result<()> {
        let unbound = self.bound.iter().filter(|b| !**b).count();
        if unbound == 0 {
            return Ok(());
        }
        let detail = if self.parameterized {
            format!("{unbound} of {} parameter(s) not bound", self.bound.len())
        } else {
            format!("statement has {unbound} parameter placeholder(s) but no parameters were supplied")
        };
        Err(Error::execution_msg("failed to execute statement", detail))
    }
}

impl<'conn> Statement for SqliteStatement<'conn> {
    type Cursor<'stmt>
        = SqliteCursor<'stmt>
    where
        Self: 'stmt;

    fn parameter_count(&self) -> usize {
        self.bound.len()
    }

    fn bind(&mut self, index: usize, param: &SqlParam) -> Result<()> {
        if index == 0 || index > self.bound.len() {
            return Err(Error::execution_msg(
                "failed to bind parameter",
                format!(
                    "parameter index {index} out of range (statement has {} placeholder(s))",
                    self.bound.len()
                ),
            ));
        }

        let result = match param {
            SqlParam::Null => self.stmt.raw_bind_parameter(index, Null),
            SqlParam::Text(v) => self.stmt.raw_bind_parameter(index, v.as_str()),
            SqlParam::Integer(v) => self.stmt.raw_bind_parameter(index, *v),
            SqlParam::Long(v) => self.stmt.raw_bind_parameter(index, *v),
            SqlParam::Float(v) => self.stmt.raw_bind_parameter(index, f64::from(*v)),
            SqlParam::Double(v) | SqlParam::OtherNumeric(v) => {
                self.stmt.raw_bind_parameter(index, *v)
            }
            SqlParam::Date(v) => self.stmt.raw_bind_parameter(index, format_date(*v)?),
            SqlParam::Time(v) => self.stmt.raw_bind_parameter(index, format_time(*v)?),
            SqlParam::Timestamp(v) => self.stmt.raw_bind_parameter(index, format_timestamp(*v)?),
            SqlParam::Opaque(v) => self.stmt.raw_bind_parameter(index, v.as_slice()),
        };
        result.map_err(|err| Error::execution("failed to bind parameter", err))?;
        self.bound[index - 1] = true;
        Ok(())
    }

    fn execute_query(&mut self) -> Result<SqliteCursor<'_>> {
        self.ensure_bound()?;
        let columns: Vec<String> = self
            .stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows = self.stmt.raw_query();
        Ok(SqliteCursor { columns, rows })
    }

    fn execute_update(&mut self) -> Result<u64> {
        self.ensure_bound()?;
        let affected = self
            .stmt
            .raw_execute()
            .map_err(|err| Error::execution("failed to execute statement", err))?;
        Ok(affected as u64)
    }
}

pub struct SqliteCursor<'stmt> {
    columns: Vec<String>,
    rows: rusqlite::Rows<'stmt>,
}

impl Cursor for SqliteCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>> {
        let width = self.columns.len();
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(err) => return Err(Error::execution("failed to fetch row", err)),
        };

        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value = row
                .get_ref(idx)
                .map_err(|err| Error::execution("failed to read column", err))?;
            values.push(match value {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(v) => SqlValue::Integer(v),
                ValueRef::Real(v) => SqlValue::Float(v),
                ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
            });
        }
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().expect("open");
        conn.raw()
            .execute_batch(
                "CREATE TABLE t (id INTEGER, v TEXT);
                 INSERT INTO t VALUES (1, 'a'), (2, NULL);",
            )
            .expect("seed");
        conn
    }

    #[test]
    fn plain_statement_with_placeholders_refuses_to_run() {
        let conn = seeded();
        let mut stmt = conn
            .create_statement("SELECT * FROM t WHERE id = ?")
            .expect("prepare");
        let err = stmt.execute_query().err().expect("unbound placeholder");
        assert!(err.to_string().contains("no parameters were supplied"));
    }

    #[test]
    fn partially_bound_statement_refuses_to_run() {
        let conn = seeded();
        let mut stmt = conn
            .prepare_statement("SELECT * FROM t WHERE id = ? AND v = ?")
            .expect("prepare");
        stmt.bind(1, &SqlParam::Integer(1)).expect("bind");
        let err = stmt.execute_query().err().expect("second param unbound");
        assert!(err.to_string().contains("1 of 2 parameter(s) not bound"));
    }

    #[test]
    fn bind_index_is_one_based_and_checked() {
        let conn = seeded();
        let mut stmt = conn
            .prepare_statement("SELECT * FROM t WHERE id = ?")
            .expect("prepare");
        assert!(stmt.bind(0, &SqlParam::Integer(1)).is_err());
        assert!(stmt.bind(2, &SqlParam::Integer(1)).is_err());
        stmt.bind(1, &SqlParam::Integer(2)).expect("bind");

        let mut cursor = stmt.execute_query().expect("query");
        assert_eq!(cursor.column_names(), ["id", "v"]);
        let row = cursor.next_row().expect("row").expect("one row");
        assert_eq!(row, vec![SqlValue::Integer(2), SqlValue::Null]);
        assert!(cursor.next_row().expect("end").is_none());
    }

    #[test]
    fn update_reports_affected_rows() {
        let conn = seeded();
        let mut stmt = conn
            .create_statement("UPDATE t SET v = 'z'")
            .expect("prepare");
        assert_eq!(stmt.execute_update().expect("update"), 2);

        let mut ddl = conn
            .create_statement("CREATE TABLE other (x INTEGER)")
            .expect("prepare");
        assert_eq!(ddl.execute_update().expect("ddl"), 0);
    }

    #[test]
    fn malformed_sql_fails_at_prepare() {
        let conn = seeded();
        let err = conn.create_statement("ELECT * FROM t").err().expect("syntax");
        assert!(matches!(err, Error::Execution { .. }));
    }
}

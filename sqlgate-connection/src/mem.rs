//! Scripted in-memory connection used for tests.
//!
//! A [`MemConnection`] answers statements from a script keyed by SQL text
//! instead of a database. Clones share the same script and statistics, so a
//! test can rewrite the script from another thread while a gateway polls,
//! and can check afterwards that every statement handed out was released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use sqlgate_result::{Error, Result};

use crate::param::SqlParam;
use crate::traits::{Connection, Cursor, Statement};
use crate::value::SqlValue;

pub const MEM_BACKEND: &str = "mem";

#[derive(Clone, Debug)]
enum Scripted {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    Affected(u64),
    Failure(String),
}

/// Counters shared by a connection and all of its clones.
#[derive(Debug, Default)]
pub struct StatementStats {
    pub opened: AtomicU64,
    pub released: AtomicU64,
    pub executed: AtomicU64,
    pub rows_fetched: AtomicU64,
}

/// Point-in-time copy of [`StatementStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatementStatsSnapshot {
    pub opened: u64,
    pub released: u64,
    pub executed: u64,
    pub rows_fetched: u64,
}

impl StatementStats {
    pub fn snapshot(&self) -> StatementStatsSnapshot {
        StatementStatsSnapshot {
            opened: self.opened.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            rows_fetched: self.rows_fetched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct MemState {
    script: Mutex<FxHashMap<String, Scripted>>,
    last_bindings: Mutex<Vec<SqlParam>>,
    stats: StatementStats,
}

#[derive(Clone, Default)]
pub struct MemConnection {
    state: Arc<MemState>,
}

fn script_key(sql: &str) -> String {
    sql.trim().to_string()
}

impl MemConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with the given rows.
    pub fn script_rows<C>(&self, sql: &str, columns: &[C], rows: Vec<Vec<SqlValue>>) -> &Self
    where
        C: AsRef<str>,
    {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self.insert(sql, Scripted::Rows { columns, rows })
    }

    /// Answer `sql` with an affected-row count.
    pub fn script_update(&self, sql: &str, affected: u64) -> &Self {
        self.insert(sql, Scripted::Affected(affected))
    }

    /// Make `sql` fail at execution with `message`.
    pub fn script_failure(&self, sql: &str, message: &str) -> &Self {
        self.insert(sql, Scripted::Failure(message.to_string()))
    }

    fn insert(&self, sql: &str, entry: Scripted) -> &Self {
        let mut script = self
            .state
            .script
            .lock()
            .expect("MemConnection script lock poisoned");
        script.insert(script_key(sql), entry);
        self
    }

    pub fn stats(&self) -> StatementStatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Statements handed out but not yet dropped.
    ///
    /// The counters are read one after the other, so a drop racing the
    /// read can make `released` run ahead of `opened`.
    pub fn open_statements(&self) -> u64 {
        let snap = self.stats();
        snap.opened.saturating_sub(snap.released)
    }

    /// Parameters bound to the most recently executed statement.
    pub fn last_bindings(&self) -> Vec<SqlParam> {
        self.state
            .last_bindings
            .lock()
            .expect("MemConnection bindings lock poisoned")
            .clone()
    }

    fn lookup(&self, sql: &str) -> Option<Scripted> {
        self.state
            .script
            .lock()
            .expect("MemConnection script lock poisoned")
            .get(&script_key(sql))
            .cloned()
    }

    fn open(&self, sql: &str, parameterized: bool) -> Result<MemStatement<'_>> {
        let placeholders = sql.matches('?').count();
        self.state.stats.opened.fetch_add(1, Ordering::Relaxed);
        Ok(MemStatement {
            conn: self,
            sql: sql.to_string(),
            parameterized,
            params: vec![None; placeholders],
        })
    }
}

impl Connection for MemConnection {
    type Statement<'conn>
        = MemStatement<'conn>
    where
        Self: 'conn;

    fn backend(&self) -> &'static str {
        MEM_BACKEND
    }

    fn description(&self) -> String {
        "in-memory scripted connection".to_string()
    }

    fn create_statement(&self, sql: &str) -> Result<MemStatement<'_>> {
        self.open(sql, false)
    }

    fn prepare_statement(&self, sql: &str) -> Result<MemStatement<'_>> {
        self.open(sql, true)
    }
}

pub struct MemStatement<'conn> {
    conn: &'conn MemConnection,
    sql: String,
    parameterized: bool,
    params: Vec<Option<SqlParam>>,
}

enum Outcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    Affected(u64),
}

impl MemStatement<'_> {
    fn run(&mut self) -> Result<Outcome> {
        self.conn.state.stats.executed.fetch_add(1, Ordering::Relaxed);
        if self.params.iter().any(Option::is_none) {
            let detail = if self.parameterized {
                "not all parameters bound"
            } else {
                "statement has parameter placeholders but no parameters were supplied"
            };
            return Err(Error::execution_msg("failed to execute statement", detail));
        }

        let bindings: Vec<SqlParam> = self.params.iter().flatten().cloned().collect();
        *self
            .conn
            .state
            .last_bindings
            .lock()
            .expect("MemConnection bindings lock poisoned") = bindings;

        match self.conn.lookup(&self.sql) {
            Some(Scripted::Rows { columns, rows }) => Ok(Outcome::Rows { columns, rows }),
            Some(Scripted::Affected(n)) => Ok(Outcome::Affected(n)),
            Some(Scripted::Failure(message)) => {
                Err(Error::execution_msg("failed to execute statement", message))
            }
            None => Err(Error::execution_msg(
                "failed to execute statement",
                "statement is not scripted",
            )),
        }
    }
}

impl Drop for MemStatement<'_> {
    fn drop(&mut self) {
        self.conn
            .state
            .stats
            .released
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl<'conn> Statement for MemStatement<'conn> {
    type Cursor<'stmt>
        = MemCursor<'stmt>
    where
        Self: 'stmt;

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn bind(&mut self, index: usize, param: &SqlParam) -> Result<()> {
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.params.get_mut(i))
            .ok_or_else(|| {
                Error::execution_msg(
                    "failed to bind parameter",
                    format!("parameter index {index} out of range"),
                )
            })?;
        *slot = Some(param.clone());
        Ok(())
    }

    fn execute_query(&mut self) -> Result<MemCursor<'_>> {
        match self.run()? {
            Outcome::Rows { columns, rows } => Ok(MemCursor {
                columns,
                rows: rows.into_iter(),
                stats: &self.conn.state.stats,
            }),
            Outcome::Affected(_) => Err(Error::execution_msg(
                "failed to execute statement",
                "statement does not return rows",
            )),
        }
    }

    fn execute_update(&mut self) -> Result<u64> {
        match self.run()? {
            Outcome::Affected(n) => Ok(n),
            Outcome::Rows { .. } => Err(Error::execution_msg(
                "failed to execute statement",
                "statement returned rows",
            )),
        }
    }
}

pub struct MemCursor<'stmt> {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
    stats: &'stmt StatementStats,
}

impl Cursor for MemCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>> {
        let row = self.rows.next();
        if row.is_some() {
            self.stats.rows_fetched.fetch_add(1, Ordering::Relaxed);
        }
        Ok(row)
    }
}

//! sqlgate: policy-gated SQL execution for test automation
//!
//! This crate is the entrypoint of the sqlgate toolkit. It re-exports the
//! gateway, its configuration and the column accessors from the underlying
//! `sqlgate-*` crates.
//!
//! # Quick Start
//!
//! Wrap an open connection in a [`SqlGateway`], query it and read typed
//! values back by 1-based row number:
//!
//! ```rust
//! use sqlgate::{GatewayConfig, SqlGateway, SqliteConnection, sql_params};
//!
//! let conn = SqliteConnection::open_in_memory().unwrap();
//! conn.raw()
//!     .execute_batch("CREATE TABLE t (id INTEGER, name TEXT); INSERT INTO t VALUES (1, 'one');")
//!     .unwrap();
//!
//! let gateway = SqlGateway::new(conn, GatewayConfig::default()).unwrap();
//! let rows = gateway.query("SELECT * FROM t WHERE id = ?", sql_params![1]).unwrap();
//! let name = gateway.columns().create_string_column("name").unwrap();
//! assert_eq!(gateway.get_column_value(&rows, 1, &name).unwrap().as_deref(), Some("one"));
//!
//! // Writes need `dml_enabled`.
//! assert!(gateway.delete("DELETE FROM t", &[]).is_err());
//! ```
//!
//! # Architecture
//!
//! - **Errors** (`sqlgate-result`): the shared [`Error`] enum and [`Result`] alias.
//! - **Connection seam** (`sqlgate-connection`): `Connection` / `Statement` /
//!   `Cursor` traits, parameter and value types, the SQLite and scripted
//!   in-memory backends.
//! - **Gateway** (`sqlgate-sql`): classification and permission policy,
//!   result buffers, typed columns, matchers and polled assertions.

// Gateway and its configuration
pub use sqlgate_sql::{GatewayConfig, ResultBuffer, SqlGateway, StatementCategory, classify};

// Column accessors
pub use sqlgate_sql::{
    Column, ColumnFactory, ColumnType, DateColumn, DoubleColumn, FloatColumn, IntColumn,
    LargeTextColumn, LongColumn, StringColumn, TimeColumn, TimestampColumn,
};

// Value matchers
pub mod matchers {
    //! Predicates for [`crate::SqlGateway::value_matches`] and
    //! [`crate::SqlGateway::assert_value_matches`].

    pub use sqlgate_sql::matcher::{Equals, IsNull, NotNull, Satisfies};
    pub use sqlgate_sql::{ValueMatcher, equals, is_null, not_null, satisfies};
}

// Connections and parameters
pub use sqlgate_connection::{
    Connection, MemConnection, SqlParam, SqlValue, SqliteConnection, sql_params,
};

// Errors
pub use sqlgate_result::{Error, Result};

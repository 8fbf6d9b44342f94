//! Policy-gated SQL execution with typed result access and polled
//! row-count assertions.
//!
//! [`SqlGateway`] wraps one open [`sqlgate_connection::Connection`]. Before
//! a statement reaches the backend it is classified lexically
//! ([`classify`]) and checked against the gateway's [`PermissionPolicy`]:
//! `SELECT` always runs, data modification needs `dml_enabled`, anything
//! else needs `ddl_enabled`.
//!
//! Queries are captured into detached [`ResultBuffer`]s and read back with
//! typed [`Column`] accessors from the gateway's [`ColumnFactory`]. Row
//! numbers are 1-based.
//!
//! The `assert_*_query` operations poll a bounded row count until the
//! condition holds or [`GatewayConfig::poll_timeout`] elapses; the
//! `is_*_query` checks evaluate once and report execution failures as
//! `false`.

pub mod buffer;
pub mod classify;
pub mod columns;
pub mod config;
pub mod gateway;
pub mod matcher;
pub mod poll;

pub use buffer::{CellRef, DataRow, DataRows, ResultBuffer, RowCursor};
pub use classify::{PermissionPolicy, StatementCategory, classify};
pub use columns::{
    Column, ColumnFactory, ColumnKind, ColumnType, DateColumn, DoubleColumn, FloatColumn,
    IntColumn, LargeTextColumn, LongColumn, StringColumn, TimeColumn, TimestampColumn,
};
pub use config::{DEFAULT_POLL_INTERVAL, GatewayConfig};
pub use gateway::SqlGateway;
pub use matcher::{ValueMatcher, equals, is_null, not_null, satisfies};
pub use poll::{PollOutcome, Poller};

//! Connection seam for sqlgate.
//!
//! The gateway never talks to a driver directly. It goes through three small
//! traits that model the parts of a driver it needs:
//!
//! - [`Connection`] hands out plain or parameterized [`Statement`]s.
//! - [`Statement`] binds [`SqlParam`]s by 1-based position and executes.
//! - [`Cursor`] walks the rows of a query forward, one [`SqlValue`] row at a time.
//!
//! Statements and cursors release their driver resources on drop.
//!
//! Two backends ship here: [`SqliteConnection`] over `rusqlite`, and the
//! scripted [`MemConnection`], which counts statement acquisition and release
//! for tests.

pub mod mem;
pub mod param;
pub mod sqlite;
pub mod temporal;
pub mod traits;
pub mod value;

pub use mem::{MEM_BACKEND, MemConnection, StatementStatsSnapshot};
pub use param::SqlParam;
pub use sqlite::{SQLITE_BACKEND, SqliteConnection};
pub use traits::{Connection, Cursor, Statement};
pub use value::SqlValue;

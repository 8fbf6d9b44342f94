//! Typed column accessors.
//!
//! A [`Column<K>`] names a result column and fixes the native type its values
//! are read as. The marker `K` is one of the kinds in [`kinds`]; the set is
//! closed, so every accessor a caller can hold comes from [`ColumnFactory`].

pub mod kinds;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sqlgate_result::{Error, Result};

use crate::buffer::CellRef;

pub use kinds::{
    DateKind, DoubleKind, FloatKind, IntKind, LargeTextKind, LongKind, StringKind, TimeKind,
    TimestampKind,
};

/// Native value type of a column accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Time,
    Timestamp,
    LargeText,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::String => "STRING",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::LargeText => "LARGE_TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Conversion from a captured cell to a column's native type.
///
/// Implemented only by the marker types in [`kinds`].
pub trait ColumnKind: sealed::Sealed + Send + Sync + 'static {
    type Value: fmt::Debug + Clone + PartialEq + Send + 'static;

    const TYPE: ColumnType;

    /// Convert a non-NULL cell of column `column`. Fails with
    /// [`Error::Execution`] when the value does not fit the native type.
    fn extract(column: &str, cell: CellRef<'_>) -> Result<Self::Value>;
}

/// Named, typed handle on a result column.
pub struct Column<K: ColumnKind> {
    name: Arc<str>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ColumnKind> Column<K> {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ColumnType {
        K::TYPE
    }
}

impl<K: ColumnKind> Clone for Column<K> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _kind: PhantomData,
        }
    }
}

impl<K: ColumnKind> fmt::Debug for Column<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("type", &K::TYPE)
            .finish()
    }
}

impl<K: ColumnKind> PartialEq for Column<K> {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

pub type IntColumn = Column<IntKind>;
pub type LongColumn = Column<LongKind>;
pub type FloatColumn = Column<FloatKind>;
pub type DoubleColumn = Column<DoubleKind>;
pub type StringColumn = Column<StringKind>;
pub type DateColumn = Column<DateKind>;
pub type TimeColumn = Column<TimeKind>;
pub type TimestampColumn = Column<TimestampKind>;
pub type LargeTextColumn = Column<LargeTextKind>;

/// Creates column accessors.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnFactory;

impl ColumnFactory {
    pub fn new() -> Self {
        Self
    }

    /// Accessor of any kind; the typed `create_*` methods delegate here.
    pub fn create_column<K: ColumnKind>(&self, name: &str) -> Result<Column<K>> {
        if name.trim().is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} column name must not be empty",
                K::TYPE
            )));
        }
        Ok(Column::new(name))
    }

    pub fn create_int_column(&self, name: &str) -> Result<IntColumn> {
        self.create_column(name)
    }

    pub fn create_long_column(&self, name: &str) -> Result<LongColumn> {
        self.create_column(name)
    }

    pub fn create_float_column(&self, name: &str) -> Result<FloatColumn> {
        self.create_column(name)
    }

    pub fn create_double_column(&self, name: &str) -> Result<DoubleColumn> {
        self.create_column(name)
    }

    pub fn create_string_column(&self, name: &str) -> Result<StringColumn> {
        self.create_column(name)
    }

    pub fn create_date_column(&self, name: &str) -> Result<DateColumn> {
        self.create_column(name)
    }

    pub fn create_time_column(&self, name: &str) -> Result<TimeColumn> {
        self.create_column(name)
    }

    pub fn create_timestamp_column(&self, name: &str) -> Result<TimestampColumn> {
        self.create_column(name)
    }

    pub fn create_large_text_column(&self, name: &str) -> Result<LargeTextColumn> {
        self.create_column(name)
    }
}

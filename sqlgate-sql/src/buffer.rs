//! Detached, fully materialized query results.
//!
//! A [`ResultBuffer`] holds every row of a query as an Arrow [`RecordBatch`].
//! It is built while the statement is still open and owns no driver
//! resources afterwards, so it can be kept, sent to another thread and read
//! long after the statement was finalized.
//!
//! Column types are inferred from the values the backend returned:
//!
//! | Values in column | Arrow type |
//! |------------------|------------|
//! | only integers | `Int64` |
//! | only reals | `Float64` |
//! | only text | `Utf8` |
//! | only blobs | `Binary` |
//! | only NULLs | `Null` |
//! | more than one storage class | dense `Union` |
//!
//! A column is never widened: in a dense union every cell stays in the child
//! array of its own storage class, so a large integer next to a real is read
//! back exactly.

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, Float64Array, Int64Array, NullArray, StringArray, UnionArray,
};
use arrow::buffer::ScalarBuffer;
use arrow::datatypes::{DataType, Field, Schema, UnionFields, UnionMode};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::pretty::pretty_format_batches;
use rustc_hash::FxHashMap;
use sqlgate_connection::{Connection, Cursor, SqlValue};
use sqlgate_result::{Error, Result};

use crate::columns::{Column, ColumnKind};
use crate::gateway::SqlGateway;

/// Borrowed view of one non-NULL captured cell, handed to
/// [`ColumnKind::extract`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellRef<'a> {
    Integer(i64),
    Float(f64),
    Text(&'a str),
    Blob(&'a [u8]),
}

/// Rows of one query, detached from the statement that produced them.
///
/// Buffers are only created by [`crate::SqlGateway::query`]. Each records the
/// backend that captured it, and a gateway refuses to read a buffer captured
/// by a different backend.
#[derive(Clone)]
pub struct ResultBuffer {
    batch: RecordBatch,
    // lowercased name -> first column index with that name
    columns_by_name: FxHashMap<String, usize>,
    backend: &'static str,
}

impl ResultBuffer {
    /// Drain `cursor` into a new buffer.
    pub(crate) fn capture<C: Cursor>(cursor: &mut C, backend: &'static str) -> Result<Self> {
        let names: Vec<String> = cursor.column_names().to_vec();
        let mut rows: Vec<Vec<SqlValue>> = Vec::new();
        while let Some(row) = cursor.next_row()? {
            rows.push(row);
        }
        tracing::trace!(
            "[GATEWAY] captured {} row(s) x {} column(s)",
            rows.len(),
            names.len()
        );
        Self::from_rows(&names, &rows, backend)
    }

    fn from_rows(names: &[String], rows: &[Vec<SqlValue>], backend: &'static str) -> Result<Self> {
        let mut fields = Vec::with_capacity(names.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let values: Vec<&SqlValue> = rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&SqlValue::Null))
                .collect();
            let array = build_array(&values)?;
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;

        let mut columns_by_name = FxHashMap::default();
        for (idx, name) in names.iter().enumerate() {
            columns_by_name.entry(name.to_lowercase()).or_insert(idx);
        }

        Ok(Self {
            batch,
            columns_by_name,
            backend,
        })
    }

    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in result order.
    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Case-insensitive lookup. With duplicate names the first column wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns_by_name.get(&name.to_lowercase()).copied()
    }

    /// Label of the backend that captured this buffer.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Render the buffer as an ASCII table.
    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(pretty_format_batches(std::slice::from_ref(&self.batch))?.to_string())
    }

    pub fn cursor(&self) -> RowCursor<'_> {
        RowCursor {
            buffer: self,
            position: 0,
        }
    }

    /// Iterate the rows in order, numbered from 1.
    pub fn rows(&self) -> DataRows<'_> {
        DataRows {
            buffer: self,
            next: 1,
        }
    }

    fn cell(&self, column: usize, row: usize) -> Result<Option<CellRef<'_>>> {
        read_cell(self.batch.column(column).as_ref(), row)
    }
}

impl fmt::Debug for ResultBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultBuffer")
            .field("backend", &self.backend)
            .field("columns", &self.column_names())
            .field("rows", &self.row_count())
            .finish()
    }
}

/// Forward cursor over a [`ResultBuffer`].
///
/// Starts before the first row; each [`RowCursor::advance`] moves one row
/// forward. Position `n` (1-based) is the current row.
#[derive(Clone, Debug)]
pub struct RowCursor<'a> {
    buffer: &'a ResultBuffer,
    position: usize,
}

impl<'a> RowCursor<'a> {
    pub fn before_first(&mut self) {
        self.position = 0;
    }

    /// Move to the next row. Returns `false` once past the last row.
    pub fn advance(&mut self) -> bool {
        if self.position < self.buffer.row_count() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// 1-based number of the current row, 0 before the first.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read `column` of the current row. `None` means SQL NULL.
    pub fn read<K: ColumnKind>(&self, column: &Column<K>) -> Result<Option<K::Value>> {
        if self.position == 0 {
            return Err(Error::OutOfBounds {
                requested: 0,
                row_count: self.buffer.row_count(),
            });
        }
        let name = column.name();
        let idx = self.buffer.column_index(name).ok_or_else(|| {
            Error::execution_msg(
                "Could not retrieve value",
                format!("column '{name}' not found in query result"),
            )
        })?;
        match self.buffer.cell(idx, self.position - 1)? {
            None => Ok(None),
            Some(cell) => K::extract(name, cell).map(Some),
        }
    }
}

/// Iterator over the rows of a [`ResultBuffer`].
#[derive(Clone, Debug)]
pub struct DataRows<'a> {
    buffer: &'a ResultBuffer,
    next: usize,
}

impl<'a> Iterator for DataRows<'a> {
    type Item = DataRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.buffer.row_count() {
            return None;
        }
        let row = DataRow {
            buffer: self.buffer,
            row_num: self.next,
        };
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.buffer.row_count() + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DataRows<'_> {}

/// One row of a [`ResultBuffer`]; values are read through
/// [`crate::SqlGateway::get_column_value`].
#[derive(Clone, Copy, Debug)]
pub struct DataRow<'a> {
    buffer: &'a ResultBuffer,
    row_num: usize,
}

impl<'a> DataRow<'a> {
    pub fn row_num(&self) -> usize {
        self.row_num
    }

    pub fn buffer(&self) -> &'a ResultBuffer {
        self.buffer
    }

    /// Read `column` of this row through `gateway`.
    pub fn value<C: Connection, K: ColumnKind>(
        &self,
        gateway: &SqlGateway<C>,
        column: &Column<K>,
    ) -> Result<Option<K::Value>> {
        gateway.get_column_value(self.buffer, self.row_num, column)
    }
}

/// Storage class of a captured cell; also the type id of its child array
/// when the column is stored as a union.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i8)]
enum StorageClass {
    Null = 0,
    Integer = 1,
    Real = 2,
    Text = 3,
    Blob = 4,
}

const STORAGE_CLASSES: [StorageClass; 5] = [
    StorageClass::Null,
    StorageClass::Integer,
    StorageClass::Real,
    StorageClass::Text,
    StorageClass::Blob,
];

impl StorageClass {
    fn of(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => StorageClass::Null,
            SqlValue::Integer(_) => StorageClass::Integer,
            SqlValue::Float(_) => StorageClass::Real,
            SqlValue::Text(_) => StorageClass::Text,
            SqlValue::Blob(_) => StorageClass::Blob,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            StorageClass::Null => DataType::Null,
            StorageClass::Integer => DataType::Int64,
            StorageClass::Real => DataType::Float64,
            StorageClass::Text => DataType::Utf8,
            StorageClass::Blob => DataType::Binary,
        }
    }

    fn type_id(self) -> i8 {
        self as i8
    }
}

/// Single storage class shared by all non-NULL values, `Null` for an
/// all-NULL column, or `None` when classes are mixed.
fn common_class(values: &[&SqlValue]) -> Option<StorageClass> {
    let mut common = StorageClass::Null;
    for value in values {
        match StorageClass::of(value) {
            StorageClass::Null => {}
            class if common == StorageClass::Null => common = class,
            class if class == common => {}
            _ => return None,
        }
    }
    Some(common)
}

// Array of one storage class; values of any other class become nulls.
fn class_array(class: StorageClass, values: &[&SqlValue]) -> ArrayRef {
    match class {
        StorageClass::Null => Arc::new(NullArray::new(values.len())),
        StorageClass::Integer => Arc::new(Int64Array::from_iter(values.iter().map(|v| match v {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }))),
        StorageClass::Real => Arc::new(Float64Array::from_iter(values.iter().map(|v| match v {
            SqlValue::Float(f) => Some(*f),
            _ => None,
        }))),
        StorageClass::Text => Arc::new(StringArray::from_iter(values.iter().map(|v| match v {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }))),
        StorageClass::Blob => Arc::new(BinaryArray::from_iter(values.iter().map(|v| match v {
            SqlValue::Blob(b) => Some(b.as_slice()),
            _ => None,
        }))),
    }
}

fn build_array(values: &[&SqlValue]) -> Result<ArrayRef> {
    match common_class(values) {
        Some(class) => Ok(class_array(class, values)),
        None => build_union(values),
    }
}

// Dense union with one child per storage class. NULL cells live in the
// `Null` child.
fn build_union(values: &[&SqlValue]) -> Result<ArrayRef> {
    let mut partitions: Vec<Vec<&SqlValue>> = vec![Vec::new(); STORAGE_CLASSES.len()];
    let mut type_ids = Vec::with_capacity(values.len());
    let mut offsets = Vec::with_capacity(values.len());
    for value in values {
        let class = StorageClass::of(value);
        let partition = &mut partitions[class.type_id() as usize];
        type_ids.push(class.type_id());
        offsets.push(partition.len() as i32);
        partition.push(*value);
    }

    let fields = UnionFields::new(
        STORAGE_CLASSES.iter().map(|class| class.type_id()),
        STORAGE_CLASSES
            .iter()
            .map(|class| Field::new(format!("{class:?}").to_lowercase(), class.data_type(), true)),
    );
    let children = STORAGE_CLASSES
        .iter()
        .zip(&partitions)
        .map(|(class, partition)| class_array(*class, partition))
        .collect();
    let union = UnionArray::try_new(
        fields,
        ScalarBuffer::from(type_ids),
        Some(ScalarBuffer::from(offsets)),
        children,
    )?;
    Ok(Arc::new(union))
}

fn downcast_err(data_type: &DataType) -> Error {
    Error::execution_msg(
        "Could not retrieve value",
        format!("captured column has unexpected type {data_type}"),
    )
}

fn read_cell(array: &dyn Array, row: usize) -> Result<Option<CellRef<'_>>> {
    if array.is_null(row) || *array.data_type() == DataType::Null {
        return Ok(None);
    }
    let data_type = array.data_type();
    let cell = match data_type {
        DataType::Union(_, UnionMode::Dense) => {
            let union = array
                .as_any()
                .downcast_ref::<UnionArray>()
                .ok_or_else(|| downcast_err(data_type))?;
            let child = union.child(union.type_id(row));
            return read_cell(child.as_ref(), union.value_offset(row));
        }
        DataType::Int64 => {
            let values = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| downcast_err(data_type))?;
            CellRef::Integer(values.value(row))
        }
        DataType::Float64 => {
            let values = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| downcast_err(data_type))?;
            CellRef::Float(values.value(row))
        }
        DataType::Binary => {
            let values = array
                .as_any()
                .downcast_ref::<BinaryArray>()
                .ok_or_else(|| downcast_err(data_type))?;
            CellRef::Blob(values.value(row))
        }
        DataType::Utf8 => {
            let values = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| downcast_err(data_type))?;
            CellRef::Text(values.value(row))
        }
        other => return Err(downcast_err(other)),
    };
    Ok(Some(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnFactory;

    fn buffer(names: &[&str], rows: Vec<Vec<SqlValue>>) -> ResultBuffer {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        ResultBuffer::from_rows(&names, &rows, "test").unwrap()
    }

    #[test]
    fn infers_column_types() {
        let buf = buffer(
            &["i", "f", "s", "b", "n", "mixed"],
            vec![
                vec![
                    SqlValue::Integer(1),
                    SqlValue::Integer(2),
                    SqlValue::Text("x".into()),
                    SqlValue::Blob(vec![1]),
                    SqlValue::Null,
                    SqlValue::Integer(5),
                ],
                vec![
                    SqlValue::Null,
                    SqlValue::Float(2.5),
                    SqlValue::Null,
                    SqlValue::Null,
                    SqlValue::Null,
                    SqlValue::Text("five".into()),
                ],
            ],
        );
        let schema = buf.record_batch().schema();
        let types: Vec<&DataType> = schema.fields().iter().map(|f| f.data_type()).collect();
        assert_eq!(types[0], &DataType::Int64);
        assert_eq!(types[2], &DataType::Utf8);
        assert_eq!(types[3], &DataType::Binary);
        assert_eq!(types[4], &DataType::Null);
        // Integers next to reals or text are not widened.
        assert!(matches!(types[1], DataType::Union(_, UnionMode::Dense)));
        assert!(matches!(types[5], DataType::Union(_, UnionMode::Dense)));
    }

    #[test]
    fn mixed_columns_keep_each_cell_exact() {
        let big = (1i64 << 53) + 1;
        let buf = buffer(
            &["v"],
            vec![
                vec![SqlValue::Integer(big)],
                vec![SqlValue::Float(1.5)],
                vec![SqlValue::Null],
                vec![SqlValue::Text("x".into())],
            ],
        );
        let column = buf.record_batch().column(0).as_ref();
        assert_eq!(read_cell(column, 0).unwrap(), Some(CellRef::Integer(big)));
        assert_eq!(read_cell(column, 1).unwrap(), Some(CellRef::Float(1.5)));
        assert_eq!(read_cell(column, 2).unwrap(), None);
        assert_eq!(read_cell(column, 3).unwrap(), Some(CellRef::Text("x")));

        let v = ColumnFactory::new().create_long_column("v").unwrap();
        let mut cursor = buf.cursor();
        cursor.advance();
        assert_eq!(cursor.read(&v).unwrap(), Some(big));
        cursor.advance();
        assert!(cursor.read(&v).is_err());
        cursor.advance();
        assert_eq!(cursor.read(&v).unwrap(), None);
    }

    #[test]
    fn zero_column_results_keep_their_row_count() {
        let buf = buffer(&[], vec![vec![], vec![], vec![]]);
        assert_eq!(buf.row_count(), 3);
        assert_eq!(buf.column_count(), 0);
    }

    #[test]
    fn lookup_is_case_insensitive_and_first_wins() {
        let buf = buffer(
            &["ID", "name", "id"],
            vec![vec![
                SqlValue::Integer(1),
                SqlValue::Text("a".into()),
                SqlValue::Integer(2),
            ]],
        );
        assert_eq!(buf.column_index("id"), Some(0));
        assert_eq!(buf.column_index("NAME"), Some(1));
        assert_eq!(buf.column_index("missing"), None);
    }

    #[test]
    fn cursor_reads_current_row() {
        let buf = buffer(
            &["id"],
            vec![vec![SqlValue::Integer(10)], vec![SqlValue::Null]],
        );
        let id = ColumnFactory::new().create_long_column("id").unwrap();

        let mut cursor = buf.cursor();
        assert!(matches!(cursor.read(&id), Err(Error::OutOfBounds { .. })));
        assert!(cursor.advance());
        assert_eq!(cursor.read(&id).unwrap(), Some(10));
        assert!(cursor.advance());
        assert_eq!(cursor.read(&id).unwrap(), None);
        assert!(!cursor.advance());
        assert_eq!(cursor.position(), 2);

        cursor.before_first();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn rows_are_numbered_from_one() {
        let buf = buffer(
            &["id"],
            vec![vec![SqlValue::Integer(1)], vec![SqlValue::Integer(2)]],
        );
        let rows = buf.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.map(|r| r.row_num()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn pretty_print_lists_values() {
        let buf = buffer(
            &["id", "name"],
            vec![vec![SqlValue::Integer(7), SqlValue::Text("seven".into())]],
        );
        let table = buf.to_pretty_string().unwrap();
        assert!(table.contains("| id | name  |"));
        assert!(table.contains("| 7  | seven |"));
    }
}

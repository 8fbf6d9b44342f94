//! Marker types for the supported column kinds and their value conversions.
//!
//! Integers stored as text are parsed, reals are accepted for integer kinds
//! only when they have no fractional part and fit into 64 bits, and an
//! integer cell read as a date, time or timestamp is taken as Unix epoch
//! seconds. Text read as a temporal kind must be in one of the text forms;
//! digits alone are not epoch seconds.

use sqlgate_connection::temporal;
use sqlgate_result::{Error, Result};
use time::{Date, PrimitiveDateTime, Time};

use super::sealed::Sealed;
use super::{ColumnKind, ColumnType};
use crate::buffer::CellRef;

fn conversion_err(column: &str, detail: impl std::fmt::Display) -> Error {
    Error::execution_msg(
        format!("Could not retrieve value of column '{column}'"),
        detail,
    )
}

fn temporal_err(column: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |err| Error::execution(format!("Could not retrieve value of column '{column}'"), err)
}

fn whole_number(column: &str, value: f64, ty: ColumnType) -> Result<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if !value.is_finite()
        || value.fract() != 0.0
        || value < i64::MIN as f64
        || value >= i64::MAX as f64
    {
        return Err(conversion_err(
            column,
            format!("value {value} cannot be read as {ty}"),
        ));
    }
    Ok(value as i64)
}

fn utf8<'a>(column: &str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes)
        .map_err(|_| conversion_err(column, "binary value is not valid UTF-8"))
}

fn epoch_timestamp(column: &str, secs: i64) -> Result<PrimitiveDateTime> {
    temporal::timestamp_from_epoch_seconds(secs).map_err(temporal_err(column))
}

fn not_temporal(column: &str, ty: ColumnType) -> Error {
    conversion_err(column, format!("value cannot be read as {ty}"))
}

macro_rules! marker {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name;

        impl Sealed for $name {}
    };
}

marker!(IntKind, "32-bit signed integer values.");
marker!(LongKind, "64-bit signed integer values.");
marker!(FloatKind, "Single-precision floating point values.");
marker!(DoubleKind, "Double-precision floating point values.");
marker!(StringKind, "Text values.");
marker!(DateKind, "Calendar dates.");
marker!(TimeKind, "Times of day.");
marker!(TimestampKind, "Date and time without offset.");
marker!(LargeTextKind, "Large text values such as CLOB columns.");

impl ColumnKind for IntKind {
    type Value = i32;
    const TYPE: ColumnType = ColumnType::Int;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<i32> {
        let wide = LongKind::extract(column, cell)?;
        i32::try_from(wide).map_err(|_| {
            conversion_err(
                column,
                format!("value {wide} does not fit into a 32-bit integer"),
            )
        })
    }
}

impl ColumnKind for LongKind {
    type Value = i64;
    const TYPE: ColumnType = ColumnType::Long;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<i64> {
        match cell {
            CellRef::Integer(v) => Ok(v),
            CellRef::Float(v) => whole_number(column, v, Self::TYPE),
            CellRef::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| conversion_err(column, format!("'{s}' is not an integer"))),
            CellRef::Blob(_) => Err(conversion_err(column, "binary value cannot be read as LONG")),
        }
    }
}

impl ColumnKind for FloatKind {
    type Value = f32;
    const TYPE: ColumnType = ColumnType::Float;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<f32> {
        let wide = DoubleKind::extract(column, cell)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(conversion_err(
                column,
                format!("value {wide} does not fit into a 32-bit float"),
            ));
        }
        Ok(wide as f32)
    }
}

impl ColumnKind for DoubleKind {
    type Value = f64;
    const TYPE: ColumnType = ColumnType::Double;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<f64> {
        match cell {
            CellRef::Integer(v) => Ok(v as f64),
            CellRef::Float(v) => Ok(v),
            CellRef::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| conversion_err(column, format!("'{s}' is not a number"))),
            CellRef::Blob(_) => Err(conversion_err(
                column,
                "binary value cannot be read as DOUBLE",
            )),
        }
    }
}

impl ColumnKind for StringKind {
    type Value = String;
    const TYPE: ColumnType = ColumnType::String;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<String> {
        Ok(match cell {
            CellRef::Integer(v) => v.to_string(),
            CellRef::Float(v) => v.to_string(),
            CellRef::Text(s) => s.to_owned(),
            CellRef::Blob(b) => utf8(column, b)?.to_owned(),
        })
    }
}

impl ColumnKind for LargeTextKind {
    type Value = String;
    const TYPE: ColumnType = ColumnType::LargeText;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<String> {
        StringKind::extract(column, cell)
    }
}

impl ColumnKind for DateKind {
    type Value = Date;
    const TYPE: ColumnType = ColumnType::Date;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<Date> {
        match cell {
            CellRef::Text(s) => temporal::parse_date(s).map_err(temporal_err(column)),
            CellRef::Integer(secs) => Ok(epoch_timestamp(column, secs)?.date()),
            _ => Err(not_temporal(column, Self::TYPE)),
        }
    }
}

impl ColumnKind for TimeKind {
    type Value = Time;
    const TYPE: ColumnType = ColumnType::Time;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<Time> {
        match cell {
            CellRef::Text(s) => temporal::parse_time(s).map_err(temporal_err(column)),
            CellRef::Integer(secs) => Ok(epoch_timestamp(column, secs)?.time()),
            _ => Err(not_temporal(column, Self::TYPE)),
        }
    }
}

impl ColumnKind for TimestampKind {
    type Value = PrimitiveDateTime;
    const TYPE: ColumnType = ColumnType::Timestamp;

    fn extract(column: &str, cell: CellRef<'_>) -> Result<PrimitiveDateTime> {
        match cell {
            CellRef::Text(s) => temporal::parse_timestamp(s).map_err(temporal_err(column)),
            CellRef::Integer(secs) => epoch_timestamp(column, secs),
            _ => Err(not_temporal(column, Self::TYPE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn int_rejects_values_outside_32_bits() {
        let over = i64::from(i32::MAX) + 2;
        assert_eq!(LongKind::extract("v", CellRef::Integer(over)).unwrap(), over);
        let err = IntKind::extract("v", CellRef::Integer(over)).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert!(err.to_string().contains("32-bit"));
        assert_eq!(IntKind::extract("v", CellRef::Integer(-7)).unwrap(), -7);
    }

    #[test]
    fn integers_accept_whole_reals_and_numeric_text() {
        assert_eq!(IntKind::extract("v", CellRef::Float(3.0)).unwrap(), 3);
        assert!(IntKind::extract("v", CellRef::Float(3.5)).is_err());
        assert_eq!(LongKind::extract("v", CellRef::Text(" 42 ")).unwrap(), 42);
        assert!(LongKind::extract("v", CellRef::Text("forty-two")).is_err());
        assert!(LongKind::extract("v", CellRef::Blob(&[1])).is_err());
    }

    #[test]
    fn reals_at_the_i64_edges() {
        let two_pow_63 = 9_223_372_036_854_775_808.0;
        assert!(LongKind::extract("v", CellRef::Float(two_pow_63)).is_err());
        assert_eq!(
            LongKind::extract("v", CellRef::Float(-two_pow_63)).unwrap(),
            i64::MIN
        );
        assert!(LongKind::extract("v", CellRef::Float(f64::INFINITY)).is_err());
        assert!(LongKind::extract("v", CellRef::Float(f64::NAN)).is_err());
    }

    #[test]
    fn floats() {
        assert_eq!(FloatKind::extract("v", CellRef::Float(17.5)).unwrap(), 17.5);
        assert_eq!(DoubleKind::extract("v", CellRef::Integer(2)).unwrap(), 2.0);
        assert!(FloatKind::extract("v", CellRef::Float(1e300)).is_err());
        assert_eq!(
            DoubleKind::extract("v", CellRef::Text("23.1234")).unwrap(),
            23.1234
        );
    }

    #[test]
    fn strings_render_any_storage_class() {
        assert_eq!(StringKind::extract("v", CellRef::Integer(5)).unwrap(), "5");
        assert_eq!(StringKind::extract("v", CellRef::Text("Bla")).unwrap(), "Bla");
        assert_eq!(
            LargeTextKind::extract("v", CellRef::Blob(b"clob")).unwrap(),
            "clob"
        );
        assert!(StringKind::extract("v", CellRef::Blob(&[0xff, 0xfe])).is_err());
    }

    #[test]
    fn temporal_from_text_and_epoch_seconds() {
        assert_eq!(
            DateKind::extract("d", CellRef::Text("2015-06-30")).unwrap(),
            date!(2015 - 06 - 30)
        );
        assert_eq!(
            TimeKind::extract("t", CellRef::Text("12:30:00")).unwrap(),
            time!(12:30:00)
        );
        assert_eq!(
            TimestampKind::extract("ts", CellRef::Integer(1_435_667_400)).unwrap(),
            datetime!(2015-06-30 12:30:00)
        );
        assert_eq!(
            TimeKind::extract("t", CellRef::Integer(1_435_667_400)).unwrap(),
            time!(12:30:00)
        );

        // Digits in a text cell are not epoch seconds.
        assert!(TimestampKind::extract("ts", CellRef::Text("1435667400")).is_err());
        assert!(matches!(
            DateKind::extract("d", CellRef::Text("20150630")),
            Err(Error::Execution { .. })
        ));

        let err = DateKind::extract("d", CellRef::Text("soon")).unwrap_err();
        assert!(err.to_string().contains("column 'd'"));
        assert!(TimestampKind::extract("ts", CellRef::Float(1.5)).is_err());
    }
}

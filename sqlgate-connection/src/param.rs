//! Positional statement parameters.
//!
//! [`SqlParam`] is a closed set of variants, each mapped to exactly one
//! binding call by the backend. Conversions from Rust values follow a fixed
//! order:
//!
//! 1. `None` becomes [`SqlParam::Null`], an untyped NULL. Some drivers need a
//!    concrete type for NULL binds; SQLite does not.
//! 2. Strings become [`SqlParam::Text`].
//! 3. `i32`, `i64` and `f32` keep their own variants; `f64` is
//!    [`SqlParam::Double`].
//! 4. Every other numeric type becomes [`SqlParam::OtherNumeric`] and binds
//!    as a double. Wide integers may lose precision.
//! 5. `time::Date` and `time::Time` bind as dates and times.
//! 6. Timestamps (`PrimitiveDateTime`, `OffsetDateTime`) and
//!    [`std::time::SystemTime`] bind as timestamps. A `SystemTime` is
//!    truncated to epoch milliseconds first.
//! 7. Raw bytes become [`SqlParam::Opaque`]. Backends bind these with their
//!    generic binding; no behavior is guaranteed across backends.

use std::time::{SystemTime, UNIX_EPOCH};

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::temporal::timestamp_from_epoch_millis;

#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Null,
    Text(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    OtherNumeric(f64),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
    Opaque(Vec<u8>),
}

impl SqlParam {
    /// Short label of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlParam::Null => "null",
            SqlParam::Text(_) => "text",
            SqlParam::Integer(_) => "integer",
            SqlParam::Long(_) => "long",
            SqlParam::Float(_) => "float",
            SqlParam::Double(_) => "double",
            SqlParam::OtherNumeric(_) => "numeric",
            SqlParam::Date(_) => "date",
            SqlParam::Time(_) => "time",
            SqlParam::Timestamp(_) => "timestamp",
            SqlParam::Opaque(_) => "opaque",
        }
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_owned())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<&String> for SqlParam {
    fn from(value: &String) -> Self {
        SqlParam::Text(value.clone())
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Integer(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Long(value)
    }
}

impl From<f32> for SqlParam {
    fn from(value: f32) -> Self {
        SqlParam::Float(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Double(value)
    }
}

macro_rules! impl_other_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SqlParam {
                fn from(value: $ty) -> Self {
                    SqlParam::OtherNumeric(value as f64)
                }
            }
        )*
    };
}

impl_other_numeric!(i8, i16, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<Date> for SqlParam {
    fn from(value: Date) -> Self {
        SqlParam::Date(value)
    }
}

impl From<Time> for SqlParam {
    fn from(value: Time) -> Self {
        SqlParam::Time(value)
    }
}

impl From<PrimitiveDateTime> for SqlParam {
    fn from(value: PrimitiveDateTime) -> Self {
        SqlParam::Timestamp(value)
    }
}

impl From<OffsetDateTime> for SqlParam {
    /// Normalized to UTC before dropping the offset.
    fn from(value: OffsetDateTime) -> Self {
        let utc = value.to_offset(UtcOffset::UTC);
        SqlParam::Timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
    }
}

impl From<SystemTime> for SqlParam {
    /// Instants outside the representable timestamp range bind as NULL.
    fn from(value: SystemTime) -> Self {
        let millis = match value.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i128,
            Err(before) => -(before.duration().as_millis() as i128),
        };
        timestamp_from_epoch_millis(millis).map_or(SqlParam::Null, SqlParam::Timestamp)
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(value: Vec<u8>) -> Self {
        SqlParam::Opaque(value)
    }
}

impl From<&[u8]> for SqlParam {
    fn from(value: &[u8]) -> Self {
        SqlParam::Opaque(value.to_vec())
    }
}

impl<T> From<Option<T>> for SqlParam
where
    T: Into<SqlParam>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlParam::Null, Into::into)
    }
}

/// Build a `&[SqlParam]` slice from heterogeneous values.
///
/// ```
/// use sqlgate_connection::{SqlParam, sql_params};
///
/// let params = sql_params!["Hello World", 1, None::<i64>];
/// assert_eq!(params[1], SqlParam::Integer(1));
/// assert_eq!(params[2], SqlParam::Null);
/// ```
#[macro_export]
macro_rules! sql_params {
    () => {
        &[] as &[$crate::SqlParam]
    };
    ($($param:expr),+ $(,)?) => {
        &[$($crate::SqlParam::from($param)),+] as &[$crate::SqlParam]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::{date, datetime, offset};

    #[test]
    fn native_widths_keep_their_variants() {
        assert_eq!(SqlParam::from(7i32), SqlParam::Integer(7));
        assert_eq!(SqlParam::from(7i64), SqlParam::Long(7));
        assert_eq!(SqlParam::from(1.5f32), SqlParam::Float(1.5));
        assert_eq!(SqlParam::from(1.5f64), SqlParam::Double(1.5));
        assert_eq!(SqlParam::from("x"), SqlParam::Text("x".into()));
    }

    #[test]
    fn other_numerics_fall_back_to_double() {
        assert_eq!(SqlParam::from(3u8), SqlParam::OtherNumeric(3.0));
        assert_eq!(SqlParam::from(40_000u64), SqlParam::OtherNumeric(40_000.0));
        assert_eq!(SqlParam::from(-2i16), SqlParam::OtherNumeric(-2.0));
        assert_eq!(SqlParam::from(9usize).kind(), "numeric");
    }

    #[test]
    fn none_is_untyped_null() {
        assert_eq!(SqlParam::from(None::<String>), SqlParam::Null);
        assert_eq!(SqlParam::from(Some(5i64)), SqlParam::Long(5));
    }

    #[test]
    fn system_time_truncates_to_millis() {
        let instant = UNIX_EPOCH + Duration::from_nanos(1_234_567_891);
        assert_eq!(
            SqlParam::from(instant),
            SqlParam::Timestamp(datetime!(1970-01-01 00:00:01.234))
        );
    }

    #[test]
    fn offset_timestamps_are_normalized_to_utc() {
        let local = datetime!(2024-05-01 10:00:00).assume_offset(offset!(+2));
        assert_eq!(
            SqlParam::from(local),
            SqlParam::Timestamp(datetime!(2024-05-01 08:00:00))
        );
        assert_eq!(
            SqlParam::from(date!(2024 - 05 - 01)),
            SqlParam::Date(date!(2024 - 05 - 01))
        );
    }

    #[test]
    fn macro_builds_a_slice() {
        let params = sql_params!["a", 2i64, 3.0f64];
        assert_eq!(params.len(), 3);
        let empty = sql_params![];
        assert!(empty.is_empty());
    }
}

//! Text encodings for temporal values.
//!
//! Backends without native temporal types (SQLite) store dates and times as
//! text. Parameters are written in the canonical forms below and column
//! values are parsed back leniently: a timestamp may use `T` as separator,
//! carry a trailing `Z`, or omit the time part entirely.
//!
//! | Kind | Canonical text |
//! |------|----------------|
//! | date | `YYYY-MM-DD` |
//! | time | `HH:MM:SS` or `HH:MM:SS.fff` |
//! | timestamp | `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD HH:MM:SS.fff` |

use sqlgate_result::{Error, Result};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const TIME_MILLIS: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
const TIME_SUBSEC: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const TIMESTAMP: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const TIMESTAMP_MILLIS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
const TIMESTAMP_SUBSEC: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const TIMESTAMP_NO_SECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn encode_err(err: time::error::Format) -> Error {
    Error::execution("could not encode temporal parameter", err)
}

fn parse_err(kind: &str, text: &str) -> Error {
    Error::execution_msg("invalid temporal value", format!("'{text}' is not a valid {kind}"))
}

pub fn format_date(date: Date) -> Result<String> {
    date.format(DATE).map_err(encode_err)
}

pub fn format_time(time: Time) -> Result<String> {
    let items = if time.nanosecond() == 0 {
        TIME
    } else {
        TIME_MILLIS
    };
    time.format(items).map_err(encode_err)
}

pub fn format_timestamp(ts: PrimitiveDateTime) -> Result<String> {
    let items = if ts.nanosecond() == 0 {
        TIMESTAMP
    } else {
        TIMESTAMP_MILLIS
    };
    ts.format(items).map_err(encode_err)
}

/// Parse a date, ignoring any time-of-day suffix.
pub fn parse_date(text: &str) -> Result<Date> {
    let trimmed = text.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(head, DATE).map_err(|_| parse_err("DATE", text))
}

/// Parse a time of day. A leading date part is skipped.
pub fn parse_time(text: &str) -> Result<Time> {
    let trimmed = text.trim().trim_end_matches('Z');
    let clock = match trimmed.rsplit_once([' ', 'T']) {
        Some((_, clock)) => clock,
        None => trimmed,
    };
    Time::parse(clock, TIME_SUBSEC)
        .or_else(|_| Time::parse(clock, TIME))
        .map_err(|_| parse_err("TIME", text))
}

/// Parse a timestamp; a bare date is read as midnight.
pub fn parse_timestamp(text: &str) -> Result<PrimitiveDateTime> {
    let normalized = text.trim().trim_end_matches('Z').replacen('T', " ", 1);
    if let Ok(ts) = PrimitiveDateTime::parse(&normalized, TIMESTAMP_SUBSEC) {
        return Ok(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(&normalized, TIMESTAMP) {
        return Ok(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(&normalized, TIMESTAMP_NO_SECONDS) {
        return Ok(ts);
    }
    Date::parse(&normalized, DATE)
        .map(|date| date.midnight())
        .map_err(|_| parse_err("TIMESTAMP", text))
}

/// Convert Unix epoch seconds (SQLite's `unixepoch()` form) to a UTC timestamp.
pub fn timestamp_from_epoch_seconds(secs: i64) -> Result<PrimitiveDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map(|odt| PrimitiveDateTime::new(odt.date(), odt.time()))
        .map_err(|err| Error::execution("invalid temporal value", err))
}

/// Convert Unix epoch milliseconds to a UTC timestamp, or `None` when the
/// instant is outside the representable range.
pub fn timestamp_from_epoch_millis(millis: i128) -> Option<PrimitiveDateTime> {
    let nanos = millis.checked_mul(1_000_000)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .map(|odt| PrimitiveDateTime::new(odt.date(), odt.time()))
}

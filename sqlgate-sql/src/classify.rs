//! Lexical statement classification and the permission check built on it.
//!
//! Classification looks only at the leading keywords of the trimmed,
//! uppercased text. It does not parse SQL. Anything that is neither a plain
//! `SELECT` nor a recognised data-modification prefix lands in
//! [`StatementCategory::Other`] and is treated as schema-changing.
//!
//! Known gaps of the lexical rule, kept on purpose so that the policy stays
//! predictable:
//!
//! - `SELECT ... FOR UPDATE` is a [`StatementCategory::Select`].
//! - A DML statement whose first line ends right after the target
//!   (`UPDATE t\nSET ...`) does not match the one-line DML pattern and is
//!   classified as [`StatementCategory::Other`].
//! - `WITH ...`, `MERGE ...`, `REPLACE ...` and `INSERT` without `INTO` are
//!   [`StatementCategory::Other`].
//! - Only the first keyword counts; a `;`-separated second statement is never
//!   looked at.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use sqlgate_result::{Error, Result};

/// Coarse category of a SQL statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatementCategory {
    /// Text starts with `SELECT ` (after trimming and uppercasing).
    Select,
    /// Text is a single line starting with `INSERT INTO `, `UPDATE ` or `DELETE `.
    Dml,
    /// Everything else, including DDL and session commands.
    Other,
}

impl StatementCategory {
    /// Label used in permission errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            StatementCategory::Select => "SELECT",
            StatementCategory::Dml => "DML",
            StatementCategory::Other => "DDL",
        }
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static DML_PATTERN: OnceLock<Regex> = OnceLock::new();

// `.` stops at line breaks and the match is anchored at both ends, so the
// whole statement must sit on one line.
fn dml_pattern() -> &'static Regex {
    DML_PATTERN.get_or_init(|| Regex::new(r"^(?:INSERT INTO|UPDATE|DELETE) .*$").expect("valid regex"))
}

/// Classify `sql` by its leading keywords.
pub fn classify(sql: &str) -> StatementCategory {
    let normalized = sql.trim().to_uppercase();
    if normalized.starts_with("SELECT ") {
        StatementCategory::Select
    } else if dml_pattern().is_match(&normalized) {
        StatementCategory::Dml
    } else {
        StatementCategory::Other
    }
}

/// Which statement categories a gateway may submit.
///
/// `SELECT` is always permitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionPolicy {
    pub dml_enabled: bool,
    pub ddl_enabled: bool,
}

impl PermissionPolicy {
    pub fn new(dml_enabled: bool, ddl_enabled: bool) -> Self {
        Self {
            dml_enabled,
            ddl_enabled,
        }
    }

    pub fn permits(&self, category: StatementCategory) -> bool {
        match category {
            StatementCategory::Select => true,
            StatementCategory::Dml => self.dml_enabled,
            StatementCategory::Other => self.ddl_enabled,
        }
    }

    /// Classify `sql` and fail with [`Error::PermissionDenied`] if its
    /// category is disabled. Nothing is sent to the backend here.
    pub fn authorize(&self, sql: &str) -> Result<StatementCategory> {
        let category = classify(sql);
        if self.permits(category) {
            return Ok(category);
        }
        let flag = match category {
            StatementCategory::Dml => "dml_enabled",
            _ => "ddl_enabled",
        };
        tracing::debug!("[GATEWAY] rejected {category} statement, {flag} is false");
        Err(Error::PermissionDenied {
            category: category.label().to_string(),
            flag,
        })
    }
}

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed driver-level error carried as the source of [`Error::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for all sqlgate operations.
///
/// The variants fall into two families that callers must be able to tell
/// apart:
///
/// - **Functional failures** ([`Error::ConditionTimeout`], [`Error::ValueMismatch`],
///   [`Error::InvalidState`]): the statement ran, but the data did not satisfy
///   the asserted condition. These are ordinary, expected test failures.
/// - **Automation failures** (everything else): the statement itself could not
///   run, was refused by policy, or the caller passed something malformed.
///
/// See [`Error::is_functional_failure`] and [`Error::is_automation_failure`].
///
/// Messages never embed full SQL text or bound parameter values.
#[derive(Error, Debug)]
pub enum Error {
    /// Statement category forbidden by the gateway's permission policy.
    ///
    /// `category` is the offending statement category (`DML` or `DDL`) and
    /// `flag` names the configuration switch that would permit it. Never
    /// retried.
    #[error(
        "{category} statement submitted, but not allowed for this database connection. Set {flag} to true if required."
    )]
    PermissionDenied {
        category: String,
        flag: &'static str,
    },

    /// Preparation, execution, binding or extraction failed.
    ///
    /// This wraps the driver-level failure (malformed SQL, missing table,
    /// unbound placeholders) or a value that cannot be converted to the
    /// requested native type (numeric overflow, unparsable temporal text).
    ///
    /// Inside the polling engine this error is terminal: a broken statement
    /// does not repair itself by waiting.
    #[error("{context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Row number outside `[1, row_count]`.
    #[error("Row number out of bounds: {requested} (only {row_count} row(s) in query result)")]
    OutOfBounds { requested: usize, row_count: usize },

    /// A result buffer or column accessor was not produced by this gateway's
    /// backend.
    #[error("{0}")]
    TypeMismatch(String),

    /// A polled row-count condition was never satisfied within the time
    /// budget.
    ///
    /// `expectation` is the business-level failure text, `expected` the
    /// predicate over the row count and `observed` the last bounded count.
    #[error("{expectation} (expected {expected}, observed {observed} after {elapsed_ms} ms)")]
    ConditionTimeout {
        expectation: String,
        expected: String,
        observed: String,
        elapsed_ms: u128,
    },

    /// A column value did not satisfy the caller's matcher.
    #[error("Value {value} in row {row}, column '{column}' does not match validation criteria: {matcher}")]
    ValueMismatch {
        row: usize,
        column: String,
        value: String,
        matcher: String,
    },

    /// The caller reported an invalid state of the system under test.
    #[error("{0}")]
    InvalidState(String),

    /// Malformed input to a factory, accessor or configuration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Arrow failed while capturing a result set into a record batch.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Wrap a driver-level failure with a short description of the operation
    /// that was attempted.
    #[inline]
    pub fn execution<E>(context: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Execution {
            context: context.into(),
            source: err.into(),
        }
    }

    /// Execution failure without an underlying driver error, e.g. a value
    /// conversion that the accessor itself rejected.
    #[inline]
    pub fn execution_msg(context: impl Into<String>, detail: impl fmt::Display) -> Self {
        Error::Execution {
            context: context.into(),
            source: detail.to_string().into(),
        }
    }

    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch(msg.into())
    }

    /// Build a [`Error::ConditionTimeout`] from the elapsed polling time.
    pub fn condition_timeout(
        expectation: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Error::ConditionTimeout {
            expectation: expectation.into(),
            expected: expected.into(),
            observed: observed.into(),
            elapsed_ms: elapsed.as_millis(),
        }
    }

    /// True when the statement ran but the data did not meet the asserted
    /// condition.
    pub fn is_functional_failure(&self) -> bool {
        matches!(
            self,
            Error::ConditionTimeout { .. } | Error::ValueMismatch { .. } | Error::InvalidState(_)
        )
    }

    /// True when the failure lies with the statement, the policy or the
    /// caller's input rather than with the data.
    pub fn is_automation_failure(&self) -> bool {
        !self.is_functional_failure()
    }
}

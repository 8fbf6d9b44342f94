//! Predicates over a single column value.

use std::fmt;

/// Predicate over an optional column value (`None` is SQL NULL).
///
/// The `Display` text describes the expectation and ends up in
/// [`sqlgate_result::Error::ValueMismatch`].
pub trait ValueMatcher<T: ?Sized>: fmt::Display {
    fn matches(&self, value: Option<&T>) -> bool;
}

/// Matches a non-NULL value equal to the expected one.
#[derive(Clone, Debug, PartialEq)]
pub struct Equals<U>(pub U);

impl<T, U> ValueMatcher<T> for Equals<U>
where
    T: PartialEq<U> + ?Sized,
    U: fmt::Debug,
{
    fn matches(&self, value: Option<&T>) -> bool {
        value.is_some_and(|v| *v == self.0)
    }
}

impl<U: fmt::Debug> fmt::Display for Equals<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "equal to {:?}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IsNull;

impl<T: ?Sized> ValueMatcher<T> for IsNull {
    fn matches(&self, value: Option<&T>) -> bool {
        value.is_none()
    }
}

impl fmt::Display for IsNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NULL")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotNull;

impl<T: ?Sized> ValueMatcher<T> for NotNull {
    fn matches(&self, value: Option<&T>) -> bool {
        value.is_some()
    }
}

impl fmt::Display for NotNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not NULL")
    }
}

/// Matches a non-NULL value accepted by a closure.
pub struct Satisfies<F> {
    description: String,
    predicate: F,
}

impl<T, F> ValueMatcher<T> for Satisfies<F>
where
    T: ?Sized,
    F: Fn(&T) -> bool,
{
    fn matches(&self, value: Option<&T>) -> bool {
        value.is_some_and(|v| (self.predicate)(v))
    }
}

impl<F> fmt::Display for Satisfies<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl<F> fmt::Debug for Satisfies<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Satisfies")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

pub fn equals<U: fmt::Debug>(expected: U) -> Equals<U> {
    Equals(expected)
}

pub fn is_null() -> IsNull {
    IsNull
}

pub fn not_null() -> NotNull {
    NotNull
}

/// Matcher from a closure; `description` is what a failure report shows.
pub fn satisfies<F>(description: impl Into<String>, predicate: F) -> Satisfies<F> {
    Satisfies {
        description: description.into(),
        predicate,
    }
}

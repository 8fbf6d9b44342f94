//! Error types and result definitions for sqlgate.
//!
//! Every sqlgate crate returns [`Result<T>`], whose error variant is the single
//! [`Error`] enum defined here. Keeping one enum lets errors cross crate
//! boundaries with `?` and keeps matching on failure kinds in one place.
//!
//! # Error Categories
//!
//! - **Policy** ([`Error::PermissionDenied`]): statement category not allowed
//! - **Execution** ([`Error::Execution`]): driver, binding or extraction failure
//! - **Addressing** ([`Error::OutOfBounds`], [`Error::TypeMismatch`]): bad row number,
//!   foreign result buffer
//! - **Functional** ([`Error::ConditionTimeout`], [`Error::ValueMismatch`],
//!   [`Error::InvalidState`]): the data did not satisfy an assertion
//! - **Input** ([`Error::InvalidArgument`]): malformed factory or config input
//! - **Capture** ([`Error::Arrow`]): record batch construction

pub mod error;
pub mod result;

pub use error::{BoxError, Error};
pub use result::Result;

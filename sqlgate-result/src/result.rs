use crate::error::Error;

/// Result type alias used throughout sqlgate.
///
/// This is a type alias for `std::result::Result<T, Error>`. Every sqlgate
/// operation that can fail returns this type.
pub type Result<T> = std::result::Result<T, Error>;

//! Result type aliases for ordercache.

use crate::OrderError;

/// A specialized `Result` type for ordercache operations.
pub type OrderResult<T> = Result<T, OrderError>;

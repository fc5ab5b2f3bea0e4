//! Result type aliases for Relaypost.

use crate::RelayError;

/// A specialized `Result` type for Relaypost operations.
pub type RelayResult<T> = Result<T, RelayError>;

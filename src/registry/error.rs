//! Registry error types

use thiserror::Error;

use super::identity::MAX_ID_LEN;

/// Error type for identifier validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Identifier is empty after trimming
    #[error("identifier is empty")]
    EmptyId,
    /// Identifier exceeds the length limit
    #[error("identifier is {0} bytes, limit is {MAX_ID_LEN}")]
    IdTooLong(usize),
    /// Identifier contains control characters
    #[error("identifier contains control characters")]
    InvalidCharacters,
}

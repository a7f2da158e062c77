//! Error types for identifier parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating server identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The identifier does not have the canonical length.
    #[error("invalid ID length: expected 36, got {actual}")]
    InvalidLength { actual: usize },

    /// A character is out of place for the 8-4-4-4-12 layout.
    #[error("invalid character {found:?} at position {position}")]
    InvalidCharacter { position: usize, found: char },

    /// The UUID portion could not be decoded.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

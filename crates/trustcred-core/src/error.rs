//! # Validation Errors
//!
//! Errors raised when constructing domain primitives from untrusted input.
//! Every variant carries the offending value so callers can echo it back.

use thiserror::Error;

/// Input failed a domain validation rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Credential identifier is not exactly 64 hexadecimal characters.
    #[error("credential ID must be a 64-character hexadecimal string, got {0:?}")]
    InvalidCredentialId(String),

    /// A timestamp could not be represented.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(u128),
}

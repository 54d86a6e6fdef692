//! Ledger client error types.

use crate::clarity::ClarityError;

/// Errors from ledger reads.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Node API returned a non-2xx status.
    #[error("Stacks node {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response body was not the expected JSON.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The node executed the call and reported failure (`okay: false`).
    #[error("read-only call {function} failed: {cause}")]
    CallFailed { function: String, cause: String },
    /// The returned Clarity value could not be decoded.
    #[error("invalid Clarity value from {function}: {source}")]
    Clarity {
        function: String,
        source: ClarityError,
    },
    /// The decoded value did not have the expected credential shape.
    #[error("malformed credential record: {0}")]
    Malformed(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

//! Error types for the verification pipeline.

use thiserror::Error;
use trustcred_core::ValidationError;
use trustcred_ledger::LedgerError;

/// Cache backend failure.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Relational metadata store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("metadata store backend: {0}")]
    Backend(String),

    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// Errors surfaced by verification operations.
///
/// Cache and metadata-store failures during enrichment never appear here;
/// they degrade to placeholders and are reported to the observer.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Malformed identifier, payload, options or batch size.
    #[error("{0}")]
    InvalidArgument(String),

    /// The credential does not exist (direct lookups only).
    #[error("credential not found: {0}")]
    NotFound(String),

    /// The ledger could not be read and the fallback strategy declined.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[source] LedgerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for VerifyError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

//! Observability side channel for the verification pipeline.
//!
//! Best-effort failures (cache errors, metadata store errors, audit writes)
//! are never propagated to callers. They are reported here instead, so the
//! HTTP layer can count them without the pipeline knowing about metrics.

use trustcred_core::{CredentialId, VerificationResult};
use trustcred_ledger::LedgerError;

/// Which cache namespace an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    Credential,
    Verification,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Verification => "verification",
        }
    }
}

/// Receives pipeline events. Every method has a no-op default.
pub trait VerificationObserver: Send + Sync {
    fn on_cache_lookup(&self, _namespace: CacheNamespace, _hit: bool) {}

    /// A best-effort dependency failed; `operation` names what was skipped.
    fn on_store_degraded(&self, _operation: &'static str, _error: &str) {}

    fn on_ledger_fallback(&self, _id: &CredentialId, _error: &LedgerError) {}

    fn on_verified(&self, _result: &VerificationResult) {}

    fn on_verify_failed(&self, _id: &CredentialId, _error: &str) {}
}

/// Observer that writes events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VerificationObserver for TracingObserver {
    fn on_cache_lookup(&self, namespace: CacheNamespace, hit: bool) {
        tracing::trace!(namespace = namespace.as_str(), hit, "cache lookup");
    }

    fn on_store_degraded(&self, operation: &'static str, error: &str) {
        tracing::warn!(operation, error, "degraded dependency, continuing without it");
    }

    fn on_ledger_fallback(&self, id: &CredentialId, error: &LedgerError) {
        tracing::warn!(credential_id = %id, error = %error, "ledger fallback engaged");
    }

    fn on_verified(&self, result: &VerificationResult) {
        tracing::info!(
            credential_id = %result.credential_id,
            exists = result.exists,
            valid = result.valid,
            revoked = result.revoked,
            expired = result.expired,
            "credential verification completed"
        );
    }

    fn on_verify_failed(&self, id: &CredentialId, error: &str) {
        tracing::error!(credential_id = %id, error, "credential verification failed");
    }
}

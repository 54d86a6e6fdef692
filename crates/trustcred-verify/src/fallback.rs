//! Ledger fallback strategies.
//!
//! When a ledger read fails, the [`LedgerReader`](crate::LedgerReader)
//! hands the error to its configured [`FallbackStrategy`]. Production uses
//! [`FailOnError`]; development can opt into [`SyntheticCredential`], which
//! answers with a fixed placeholder record so the API stays usable without a
//! reachable node. Neither strategy retries.

use chrono::{Duration, Utc};
use trustcred_core::{Credential, CredentialId};
use trustcred_ledger::LedgerError;

/// Decides what a failed ledger read turns into.
pub trait FallbackStrategy: Send + Sync {
    /// Either substitute a credential or propagate the error.
    fn on_ledger_error(
        &self,
        id: &CredentialId,
        error: LedgerError,
    ) -> Result<Credential, LedgerError>;

    fn name(&self) -> &'static str;
}

/// Propagate every ledger error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOnError;

impl FallbackStrategy for FailOnError {
    fn on_ledger_error(
        &self,
        _id: &CredentialId,
        error: LedgerError,
    ) -> Result<Credential, LedgerError> {
        Err(error)
    }

    fn name(&self) -> &'static str {
        "fail"
    }
}

/// Answer with a fixed synthetic credential: issued a day ago, valid for a
/// year, not revoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticCredential;

impl SyntheticCredential {
    pub fn credential(id: &CredentialId) -> Credential {
        let now = Utc::now();
        Credential {
            credential_id: id.clone(),
            issuer: "ST1SAMPLE...ISSUER".to_string(),
            recipient: "ST1SAMPLE...RECIPIENT".to_string(),
            schema_id: "schema-123".to_string(),
            issued_at: now - Duration::days(1),
            expires_at: Some(now + Duration::days(365)),
            revoked: false,
            revoked_at: None,
            data_hash: "abc123def456".to_string(),
            metadata_uri: format!("https://ipfs.io/ipfs/{id}"),
            valid: true,
        }
    }
}

impl FallbackStrategy for SyntheticCredential {
    fn on_ledger_error(
        &self,
        id: &CredentialId,
        error: LedgerError,
    ) -> Result<Credential, LedgerError> {
        tracing::warn!(
            credential_id = %id,
            error = %error,
            "ledger read failed, answering with synthetic credential"
        );
        Ok(Self::credential(id))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err() -> LedgerError {
        LedgerError::CallFailed {
            function: "get-credential".into(),
            cause: "boom".into(),
        }
    }

    #[test]
    fn fail_on_error_propagates() {
        let id = CredentialId::from_bytes([1; 32]);
        assert!(FailOnError.on_ledger_error(&id, err()).is_err());
    }

    #[test]
    fn synthetic_is_valid_and_keyed_by_id() {
        let id = CredentialId::from_bytes([2; 32]);
        let c = SyntheticCredential.on_ledger_error(&id, err()).unwrap();
        assert_eq!(c.credential_id, id);
        assert!(c.valid && !c.revoked);
        assert!(c.ledger_valid_at(Utc::now()));
        assert_eq!(c.metadata_uri, format!("https://ipfs.io/ipfs/{id}"));
    }
}

//! # Ledger Credential Record
//!
//! [`Credential`] is the normalized form of a credential tuple read from the
//! ledger contract. It is immutable once issued, except for `revoked` and
//! `revoked_at`, which an external revoke action sets exactly once.
//!
//! Ledger integers are interpreted as Unix timestamps in milliseconds; see
//! [`timestamp_from_millis`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::CredentialId;

/// A credential as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub credential_id: CredentialId,
    /// Issuer principal (c32check address).
    pub issuer: String,
    /// Recipient principal (c32check address).
    pub recipient: String,
    /// Schema identifier (lowercase hex of the schema buffer).
    pub schema_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Content hash (lowercase hex).
    pub data_hash: String,
    pub metadata_uri: String,
    /// Ledger-side validity at read time: not revoked and not past expiry.
    pub valid: bool,
}

impl Credential {
    /// Whether the credential is past its expiry at `now`.
    ///
    /// A credential without an expiry never expires. The boundary instant
    /// itself is not expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now > expiry)
    }

    /// Ledger-side validity: not revoked and strictly before expiry.
    pub fn ledger_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at.map_or(true, |expiry| now < expiry)
    }
}

/// Derived status flags for an existing credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub valid: bool,
    pub revoked: bool,
    pub expired: bool,
}

impl StatusFlags {
    /// Derive status at `now`.
    ///
    /// `valid` requires the ledger-side flag, no revocation and no expiry,
    /// so it is never true alongside `revoked` or `expired`.
    pub fn derive(credential: &Credential, now: DateTime<Utc>) -> Self {
        let expired = credential.is_expired_at(now);
        let revoked = credential.revoked;
        Self {
            valid: credential.valid && !revoked && !expired,
            revoked,
            expired,
        }
    }
}

/// Convert a ledger integer (Unix milliseconds) into a UTC timestamp.
///
/// # Errors
///
/// Returns [`ValidationError::TimestampOutOfRange`] when the value does not
/// fit chrono's representable range.
pub fn timestamp_from_millis(millis: u128) -> Result<DateTime<Utc>, ValidationError> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(ValidationError::TimestampOutOfRange(millis))
}

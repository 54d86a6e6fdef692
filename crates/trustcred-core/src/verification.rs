//! # Verification Results
//!
//! Derived, per-request judgments about a credential. Nothing here is
//! persisted as a source of truth; results are recomputed from the ledger
//! record and relational metadata and only cached for a short window.
//!
//! ## Invariants
//!
//! - `valid` is never true while `revoked` or `expired` is true.
//! - `exists == false` implies every other flag is false and every other
//!   field holds its default. [`VerificationResult::not_found`] and
//!   [`VerificationResult::failed`] are the only constructors for that case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::CredentialId;

/// Where the data behind a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationSource {
    /// Ledger only (not-found and error results).
    Blockchain,
    /// Ledger record enriched with relational metadata.
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSummary {
    pub address: String,
    pub name: String,
    pub verified: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl IssuerSummary {
    /// Placeholder used when no organization row matches the issuer.
    pub fn unknown(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: "Unknown Issuer".to_string(),
            verified: false,
            kind: "unknown".to_string(),
        }
    }

    fn empty() -> Self {
        Self {
            address: String::new(),
            name: String::new(),
            verified: false,
            kind: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSummary {
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub metadata_uri: String,
    pub data_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// The outcome of verifying one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub credential_id: CredentialId,
    pub exists: bool,
    pub valid: bool,
    pub revoked: bool,
    pub expired: bool,
    pub issuer: IssuerSummary,
    pub recipient: RecipientSummary,
    pub metadata: VerificationMetadata,
    pub schema: Option<SchemaSummary>,
    pub verification_timestamp: DateTime<Utc>,
    pub source: VerificationSource,
}

impl VerificationResult {
    /// Zero-value result for an identifier with no ledger record.
    pub fn not_found(credential_id: CredentialId, now: DateTime<Utc>) -> Self {
        Self {
            credential_id,
            exists: false,
            valid: false,
            revoked: false,
            expired: false,
            issuer: IssuerSummary::empty(),
            recipient: RecipientSummary::default(),
            metadata: VerificationMetadata::default(),
            schema: None,
            verification_timestamp: now,
            source: VerificationSource::Blockchain,
        }
    }

    /// Error-flavored result substituted for a failed batch item.
    ///
    /// Same shape as [`not_found`](Self::not_found) with the issuer marked
    /// `Error` so clients can tell the two apart.
    pub fn failed(credential_id: CredentialId, now: DateTime<Utc>) -> Self {
        let mut result = Self::not_found(credential_id, now);
        result.issuer.name = "Error".to_string();
        result.issuer.kind = "error".to_string();
        result
    }
}

/// Aggregate counts over a batch.
///
/// `invalid` counts every existing-but-not-valid item, so revoked and
/// expired items appear in both `invalid` and their own tally.
/// `valid + invalid + not_found == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub revoked: usize,
    pub expired: usize,
    pub not_found: usize,
}

impl BatchSummary {
    /// Count results in a single scan.
    pub fn tally(results: &[VerificationResult]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut acc, r| {
                if r.valid {
                    acc.valid += 1;
                }
                if r.exists && !r.valid {
                    acc.invalid += 1;
                }
                if r.revoked {
                    acc.revoked += 1;
                }
                if r.expired {
                    acc.expired += 1;
                }
                if !r.exists {
                    acc.not_found += 1;
                }
                acc
            },
        )
    }
}

/// Results aligned with input order, plus aggregate counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub results: Vec<VerificationResult>,
    pub summary: BatchSummary,
    pub timestamp: DateTime<Utc>,
}

impl BatchResult {
    pub fn new(results: Vec<VerificationResult>, now: DateTime<Utc>) -> Self {
        let summary = BatchSummary::tally(&results);
        Self {
            results,
            summary,
            timestamp: now,
        }
    }
}

/// Public lifecycle status. Revocation takes precedence over expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Revoked,
    Expired,
}

impl CredentialStatus {
    pub fn from_flags(revoked: bool, expired: bool) -> Self {
        if revoked {
            Self::Revoked
        } else if expired {
            Self::Expired
        } else {
            Self::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIssuer {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSchema {
    pub name: String,
    pub version: String,
}

impl PublicSchema {
    /// Fill in placeholders for a missing schema name or version.
    pub fn or_placeholder(name: Option<String>, version: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| "Unknown Schema".to_string()),
            version: version.unwrap_or_else(|| "1.0".to_string()),
        }
    }
}

/// Shareable projection of a credential, safe to expose without auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCredentialInfo {
    pub credential_id: CredentialId,
    pub issuer: PublicIssuer,
    pub schema: PublicSchema,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: CredentialStatus,
}

impl PublicCredentialInfo {
    /// Project a verification result. Returns `None` when the credential
    /// does not exist.
    pub fn from_verification(result: &VerificationResult) -> Option<Self> {
        if !result.exists {
            return None;
        }
        let schema = result.schema.as_ref();
        Some(Self {
            credential_id: result.credential_id.clone(),
            issuer: PublicIssuer {
                name: result.issuer.name.clone(),
                kind: result.issuer.kind.clone(),
                verified: result.issuer.verified,
            },
            schema: PublicSchema::or_placeholder(
                schema.map(|s| s.name.clone()),
                schema.map(|s| s.version.clone()),
            ),
            issued_at: result.metadata.issued_at,
            expires_at: result.metadata.expires_at,
            status: CredentialStatus::from_flags(result.revoked, result.expired),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> CredentialId {
        CredentialId::from_bytes([byte; 32])
    }

    fn existing(byte: u8, valid: bool, revoked: bool, expired: bool) -> VerificationResult {
        let mut r = VerificationResult::not_found(id(byte), Utc::now());
        r.exists = true;
        r.valid = valid;
        r.revoked = revoked;
        r.expired = expired;
        r.issuer = IssuerSummary::unknown("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM");
        r.source = VerificationSource::Hybrid;
        r
    }

    #[test]
    fn not_found_is_all_defaults() {
        let r = VerificationResult::not_found(id(1), Utc::now());
        assert!(!r.exists && !r.valid && !r.revoked && !r.expired);
        assert!(r.schema.is_none());
        assert_eq!(r.metadata, VerificationMetadata::default());
        assert_eq!(r.source, VerificationSource::Blockchain);
    }

    #[test]
    fn failed_result_marks_issuer() {
        let r = VerificationResult::failed(id(2), Utc::now());
        assert!(!r.exists);
        assert_eq!(r.issuer.name, "Error");
        assert_eq!(r.issuer.kind, "error");
    }

    #[test]
    fn tally_double_counts_revoked_and_expired_as_invalid() {
        let results = vec![
            existing(1, true, false, false),
            existing(2, false, true, false),
            existing(3, false, false, true),
            existing(4, false, true, true),
            VerificationResult::not_found(id(5), Utc::now()),
            VerificationResult::failed(id(6), Utc::now()),
        ];
        let s = BatchSummary::tally(&results);
        assert_eq!(s.total, 6);
        assert_eq!(s.valid, 1);
        assert_eq!(s.invalid, 3);
        assert_eq!(s.revoked, 2);
        assert_eq!(s.expired, 2);
        assert_eq!(s.not_found, 2);
        assert_eq!(s.valid + s.invalid + s.not_found, s.total);
    }

    #[test]
    fn status_precedence() {
        assert_eq!(CredentialStatus::from_flags(true, true), CredentialStatus::Revoked);
        assert_eq!(CredentialStatus::from_flags(false, true), CredentialStatus::Expired);
        assert_eq!(CredentialStatus::from_flags(false, false), CredentialStatus::Active);
    }

    #[test]
    fn public_info_uses_schema_placeholders() {
        let r = existing(7, true, false, false);
        let info = PublicCredentialInfo::from_verification(&r).unwrap();
        assert_eq!(info.schema.name, "Unknown Schema");
        assert_eq!(info.schema.version, "1.0");
        assert_eq!(info.status, CredentialStatus::Active);
        assert_eq!(info.issuer.name, "Unknown Issuer");
    }

    #[test]
    fn public_info_absent_for_missing_credential() {
        let r = VerificationResult::not_found(id(8), Utc::now());
        assert!(PublicCredentialInfo::from_verification(&r).is_none());
    }

    #[test]
    fn json_shape() {
        let r = existing(9, false, true, false);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["issuer"]["type"], "unknown");
        assert_eq!(json["source"], "hybrid");
        assert!(json.get("verificationTimestamp").is_some());
        assert!(json["metadata"].get("metadataUri").is_some());

        let batch = BatchResult::new(vec![r], Utc::now());
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["summary"]["notFound"], 0);
        assert_eq!(json["summary"]["revoked"], 1);
    }
}

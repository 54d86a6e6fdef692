//! Merge a ledger record with relational metadata into a
//! [`VerificationResult`].
//!
//! Ledger values win wherever both sides carry a field; database columns
//! only fill gaps. Missing organization or schema rows degrade to
//! placeholders.

use chrono::{DateTime, Utc};
use trustcred_core::{
    Credential, IssuerSummary, RecipientSummary, SchemaSummary, StatusFlags, VerificationMetadata,
    VerificationResult, VerificationSource,
};

use crate::store::{CredentialRow, IssuerRecord, SchemaRecord};

/// Relational data gathered for one credential. Every part is optional.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub row: Option<CredentialRow>,
    pub issuer: Option<IssuerRecord>,
    pub schema: Option<SchemaRecord>,
}

fn prefer_ledger(ledger: &str, db: Option<&String>) -> String {
    if ledger.is_empty() {
        db.cloned().unwrap_or_default()
    } else {
        ledger.to_string()
    }
}

/// Build the verification result for an existing credential at `now`.
pub fn merge(credential: &Credential, enrichment: Enrichment, now: DateTime<Utc>) -> VerificationResult {
    let flags = StatusFlags::derive(credential, now);
    let row = enrichment.row.unwrap_or_default();

    let issuer = match enrichment.issuer {
        Some(org) => IssuerSummary {
            address: credential.issuer.clone(),
            name: org.name,
            verified: org.verified,
            kind: org.kind,
        },
        None => IssuerSummary::unknown(credential.issuer.clone()),
    };

    let (name, description) = enrichment
        .schema
        .as_ref()
        .map(|s| (Some(s.name.clone()), s.description.clone()))
        .unwrap_or((None, None));

    VerificationResult {
        credential_id: credential.credential_id.clone(),
        exists: true,
        valid: flags.valid,
        revoked: flags.revoked,
        expired: flags.expired,
        issuer,
        recipient: RecipientSummary {
            address: prefer_ledger(&credential.recipient, row.recipient_address.as_ref()),
        },
        metadata: VerificationMetadata {
            name,
            description,
            issued_at: Some(credential.issued_at),
            expires_at: credential.expires_at,
            revoked_at: if flags.revoked { credential.revoked_at } else { None },
            metadata_uri: prefer_ledger(&credential.metadata_uri, row.metadata_uri.as_ref()),
            data_hash: prefer_ledger(&credential.data_hash, row.data_hash.as_ref()),
        },
        schema: enrichment.schema.map(|s| SchemaSummary {
            id: s.id,
            name: s.name,
            version: s.version,
        }),
        verification_timestamp: now,
        source: VerificationSource::Hybrid,
    }
}

//! Normalization of the contract's credential tuple into a [`Credential`].
//!
//! `get-credential` returns `(optional (tuple ...))`, possibly wrapped in
//! `(ok ...)`. Field names are kebab-case on chain; camelCase names are
//! accepted as well for contracts deployed with the older layout.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use trustcred_core::credential::timestamp_from_millis;
use trustcred_core::{Credential, CredentialId};

use crate::clarity::ClarityValue;
use crate::error::LedgerError;

type Fields = BTreeMap<String, ClarityValue>;

fn field<'a>(fields: &'a Fields, kebab: &str, camel: &str) -> Option<&'a ClarityValue> {
    fields.get(kebab).or_else(|| fields.get(camel))
}

fn required<'a>(fields: &'a Fields, kebab: &str, camel: &str) -> Result<&'a ClarityValue, LedgerError> {
    field(fields, kebab, camel).ok_or_else(|| LedgerError::Malformed(format!("missing field {kebab}")))
}

fn text(fields: &Fields, kebab: &str, camel: &str) -> Result<String, LedgerError> {
    match field(fields, kebab, camel) {
        None => Ok(String::new()),
        Some(v) => v
            .as_text()
            .ok_or_else(|| LedgerError::Malformed(format!("field {kebab} is not text"))),
    }
}

fn timestamp(value: &ClarityValue, name: &str) -> Result<DateTime<Utc>, LedgerError> {
    let millis = value
        .as_uint()
        .ok_or_else(|| LedgerError::Malformed(format!("field {name} is not an integer")))?;
    timestamp_from_millis(millis).map_err(|e| LedgerError::Malformed(e.to_string()))
}

/// Optional timestamps may be `none`, `(some u)` or a bare `u`; zero means
/// unset.
fn optional_timestamp(
    fields: &Fields,
    kebab: &str,
    camel: &str,
) -> Result<Option<DateTime<Utc>>, LedgerError> {
    let Some(value) = field(fields, kebab, camel).cloned().and_then(ClarityValue::into_optional)
    else {
        return Ok(None);
    };
    if value.as_uint() == Some(0) {
        return Ok(None);
    }
    timestamp(&value, kebab).map(Some)
}

/// Convert the raw call result into a credential, `None` when the contract
/// has no record under `id`.
pub fn credential_from_value(
    id: &CredentialId,
    value: ClarityValue,
    now: DateTime<Utc>,
) -> Result<Option<Credential>, LedgerError> {
    let value = match value.unwrap_response() {
        ClarityValue::ResponseErr(inner) => {
            return Err(LedgerError::Malformed(format!("contract returned err {inner:?}")))
        }
        other => other,
    };
    let Some(record) = value.into_optional() else {
        return Ok(None);
    };
    let fields = record
        .as_tuple()
        .ok_or_else(|| LedgerError::Malformed("expected a tuple".to_string()))?;

    let issuer = required(fields, "issuer", "issuer")?
        .as_text()
        .ok_or_else(|| LedgerError::Malformed("issuer is not a principal".to_string()))?;
    let issued_at = timestamp(required(fields, "issued-at", "issuedAt")?, "issued-at")?;
    let revoked = required(fields, "revoked", "revoked")?
        .as_bool()
        .ok_or_else(|| LedgerError::Malformed("revoked is not a bool".to_string()))?;

    let mut credential = Credential {
        credential_id: id.clone(),
        issuer,
        recipient: text(fields, "recipient", "recipient")?,
        schema_id: text(fields, "schema-id", "schemaId")?,
        issued_at,
        expires_at: optional_timestamp(fields, "expires-at", "expiresAt")?,
        revoked,
        revoked_at: optional_timestamp(fields, "revoked-at", "revokedAt")?,
        data_hash: text(fields, "data-hash", "dataHash")?,
        metadata_uri: text(fields, "metadata-uri", "metadataUri")?,
        valid: false,
    };
    credential.valid = credential.ledger_valid_at(now);
    Ok(Some(credential))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c32::c32_address_decode;

    fn principal(address: &str) -> ClarityValue {
        let (version, hash160) = c32_address_decode(address).unwrap();
        ClarityValue::StandardPrincipal { version, hash160 }
    }

    fn tuple(expires_at: ClarityValue, revoked: bool) -> ClarityValue {
        let mut f = Fields::new();
        f.insert("issuer".into(), principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"));
        f.insert("recipient".into(), principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"));
        f.insert("schema-id".into(), ClarityValue::Buffer(vec![0x11; 32]));
        f.insert("issued-at".into(), ClarityValue::UInt(1_700_000_000_000));
        f.insert("expires-at".into(), expires_at);
        f.insert("revoked".into(), ClarityValue::Bool(revoked));
        f.insert("revoked-at".into(), ClarityValue::OptionalNone);
        f.insert("data-hash".into(), ClarityValue::Buffer(vec![0x22; 32]));
        f.insert("metadata-uri".into(), ClarityValue::StringUtf8("ipfs://QmHash".into()));
        ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(f)))
    }

    fn id() -> CredentialId {
        CredentialId::from_bytes([0xab; 32])
    }

    #[test]
    fn none_is_not_found() {
        let out = credential_from_value(&id(), ClarityValue::OptionalNone, Utc::now()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn normalizes_tuple() {
        let c = credential_from_value(&id(), tuple(ClarityValue::OptionalNone, false), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(c.issuer, "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM");
        assert_eq!(c.schema_id, "11".repeat(32));
        assert_eq!(c.data_hash, "22".repeat(32));
        assert_eq!(c.metadata_uri, "ipfs://QmHash");
        assert_eq!(c.issued_at.timestamp_millis(), 1_700_000_000_000);
        assert!(c.expires_at.is_none());
        assert!(c.valid);
    }

    #[test]
    fn past_expiry_is_not_ledger_valid() {
        let expiry = ClarityValue::OptionalSome(Box::new(ClarityValue::UInt(1_700_000_100_000)));
        let c = credential_from_value(&id(), tuple(expiry, false), Utc::now())
            .unwrap()
            .unwrap();
        assert!(c.expires_at.is_some());
        assert!(!c.valid);
    }

    #[test]
    fn revoked_is_not_ledger_valid() {
        let wrapped = ClarityValue::ResponseOk(Box::new(tuple(ClarityValue::OptionalNone, true)));
        let c = credential_from_value(&id(), wrapped, Utc::now()).unwrap().unwrap();
        assert!(c.revoked);
        assert!(!c.valid);
    }

    #[test]
    fn missing_issuer_is_malformed() {
        let mut f = Fields::new();
        f.insert("revoked".into(), ClarityValue::Bool(false));
        let value = ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(f)));
        assert!(matches!(
            credential_from_value(&id(), value, Utc::now()),
            Err(LedgerError::Malformed(_))
        ));
    }

    #[test]
    fn camel_case_fields_accepted() {
        let mut f = Fields::new();
        f.insert("issuer".into(), principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"));
        f.insert("issuedAt".into(), ClarityValue::UInt(1_600_000_000_000));
        f.insert("expiresAt".into(), ClarityValue::UInt(0));
        f.insert("revoked".into(), ClarityValue::Bool(false));
        let value = ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(f)));
        let c = credential_from_value(&id(), value, Utc::now()).unwrap().unwrap();
        assert_eq!(c.issued_at.timestamp_millis(), 1_600_000_000_000);
        assert!(c.expires_at.is_none());
        assert_eq!(c.recipient, "");
    }
}

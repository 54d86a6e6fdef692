//! # Credential Identifier
//!
//! [`CredentialId`] is the 32-byte key under which a credential is stored in
//! the ledger contract, written as 64 hexadecimal characters.
//!
//! ## Validation
//!
//! - Exactly 64 characters after trimming surrounding whitespace.
//! - Every character is `0-9`, `a-f` or `A-F`.
//! - Input is case-insensitive; the canonical form is lowercase, so
//!   `"ABCD…"` and `"abcd…"` produce equal identifiers and the same cache key.
//! - A `0x` prefix is rejected: the HTTP surface never accepts it.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// Number of hexadecimal characters in a credential identifier.
pub const CREDENTIAL_ID_HEX_LEN: usize = 64;

/// A validated, lowercase 64-hex-character credential identifier.
///
/// Keeps the decoded key next to its canonical text, so both views are
/// available without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialId {
    hex: String,
    bytes: [u8; 32],
}

impl Serialize for CredentialId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex)
    }
}

impl<'de> Deserialize<'de> for CredentialId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl CredentialId {
    /// Parse and canonicalize a credential identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCredentialId`] if the value is not
    /// exactly 64 hexadecimal characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.len() != CREDENTIAL_ID_HEX_LEN {
            return Err(ValidationError::InvalidCredentialId(raw));
        }
        let mut bytes = [0u8; 32];
        if hex::decode_to_slice(trimmed, &mut bytes).is_err() {
            return Err(ValidationError::InvalidCredentialId(raw));
        }
        Ok(Self::from_bytes(bytes))
    }

    /// Access the canonical lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// The raw 32-byte ledger key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    /// Build an identifier from a raw 32-byte ledger key.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            hex: hex::encode(bytes),
            bytes,
        }
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}

impl std::str::FromStr for CredentialId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CredentialId {
    fn as_ref(&self) -> &str {
        &self.hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd";

    #[test]
    fn accepts_lowercase_hex() {
        let id = CredentialId::new(SAMPLE).unwrap();
        assert_eq!(id.as_str(), SAMPLE);
    }

    #[test]
    fn uppercase_is_canonicalized() {
        let id = CredentialId::new(SAMPLE.to_ascii_uppercase()).unwrap();
        assert_eq!(id.as_str(), SAMPLE);
        assert_eq!(id, CredentialId::new(SAMPLE).unwrap());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let id = CredentialId::new(format!("  {SAMPLE}\n")).unwrap();
        assert_eq!(id.as_str(), SAMPLE);
    }

    #[test]
    fn rejects_non_hex() {
        assert!(CredentialId::new("not-hex").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(CredentialId::new("abc123").is_err());
        assert!(CredentialId::new(&SAMPLE[..63]).is_err());
        assert!(CredentialId::new(format!("{SAMPLE}0")).is_err());
    }

    #[test]
    fn rejects_0x_prefix() {
        assert!(CredentialId::new(format!("0x{}", &SAMPLE[2..])).is_err());
    }

    #[test]
    fn error_echoes_input() {
        let err = CredentialId::new("zzz").unwrap_err();
        assert_eq!(err, ValidationError::InvalidCredentialId("zzz".into()));
        assert!(err.to_string().contains("64-character"));
    }

    #[test]
    fn bytes_round_trip() {
        let id = CredentialId::new(SAMPLE).unwrap();
        let bytes = id.to_bytes();
        assert_eq!(bytes[0], 0xa1);
        assert_eq!(bytes[31], 0xcd);
        assert_eq!(CredentialId::from_bytes(bytes), id);
    }

    #[test]
    fn mixed_case_decodes_to_same_key() {
        let mixed = format!("{}{}", &SAMPLE[..32].to_ascii_uppercase(), &SAMPLE[32..]);
        let id = CredentialId::new(mixed).unwrap();
        assert_eq!(id.to_bytes(), CredentialId::new(SAMPLE).unwrap().to_bytes());
        assert_eq!(id.as_str(), SAMPLE);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = CredentialId::new(SAMPLE).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{SAMPLE}\""));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<CredentialId, _> = serde_json::from_str(&format!("\"{SAMPLE}\""));
        assert!(ok.is_ok());
        let bad: Result<CredentialId, _> = serde_json::from_str("\"abc123\"");
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn any_32_bytes_make_a_valid_id(bytes in proptest::array::uniform32(any::<u8>())) {
            let encoded = hex::encode_upper(bytes);
            let id = CredentialId::new(encoded).unwrap();
            prop_assert_eq!(id.to_bytes(), bytes);
            prop_assert!(id.as_str().chars().all(|c| !c.is_ascii_uppercase()));
        }

        #[test]
        fn short_strings_are_rejected(s in "[0-9a-f]{0,63}") {
            prop_assert!(CredentialId::new(s).is_err());
        }

        #[test]
        fn non_hex_character_is_rejected(prefix in "[0-9a-f]{32}", bad in "[g-z]", suffix in "[0-9a-f]{31}") {
            let candidate = format!("{prefix}{bad}{suffix}");
            prop_assert_eq!(candidate.len(), 64);
            prop_assert!(CredentialId::new(candidate).is_err());
        }
    }
}

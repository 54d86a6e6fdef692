//! # Clarity Value Codec
//!
//! Consensus binary serialization of Clarity values, as exchanged with a
//! Stacks node's read-only call endpoint (hex strings prefixed with `0x`).
//!
//! ## Wire Layout
//!
//! Every value starts with a one-byte type prefix. Lengths are big-endian
//! `u32`; integers are big-endian 128-bit.
//!
//! | Prefix | Type | Body |
//! |--------|------|------|
//! | `0x00` | int | 16 bytes |
//! | `0x01` | uint | 16 bytes |
//! | `0x02` | buffer | len + bytes |
//! | `0x03` / `0x04` | true / false | empty |
//! | `0x05` | standard principal | version + 20-byte hash |
//! | `0x06` | contract principal | version + hash + u8 len + name |
//! | `0x07` / `0x08` | ok / err | value |
//! | `0x09` / `0x0a` | none / some | empty / value |
//! | `0x0b` | list | len + values |
//! | `0x0c` | tuple | len + (u8 len + name + value)* |
//! | `0x0d` / `0x0e` | string-ascii / string-utf8 | len + bytes |

use std::collections::BTreeMap;

use thiserror::Error;

use crate::c32;

/// Maximum nesting depth accepted by the decoder.
const MAX_DEPTH: usize = 32;

/// Errors from encoding or decoding Clarity values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClarityError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unknown type prefix 0x{0:02x}")]
    UnknownType(u8),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid UTF-8 in {0}")]
    Utf8(&'static str),

    #[error("value nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("tuple field name longer than 128 bytes")]
    NameTooLong,
}

/// A decoded Clarity value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    StandardPrincipal {
        version: u8,
        hash160: [u8; 20],
    },
    ContractPrincipal {
        version: u8,
        hash160: [u8; 20],
        name: String,
    },
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    /// Serialize into the consensus binary layout.
    ///
    /// Tuple fields are written in lexicographic name order, which is what
    /// `BTreeMap` iteration yields.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClarityError> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// Serialize and hex-encode with a `0x` prefix.
    pub fn to_hex(&self) -> Result<String, ClarityError> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }

    /// Decode a complete value; trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClarityError> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.value(0)?;
        let rest = bytes.len() - reader.pos;
        if rest != 0 {
            return Err(ClarityError::TrailingBytes(rest));
        }
        Ok(value)
    }

    /// Decode from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ClarityError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| ClarityError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Unwrap `(ok v)` to `v`; any other value is returned unchanged.
    pub fn unwrap_response(self) -> Self {
        match self {
            Self::ResponseOk(inner) => *inner,
            other => other,
        }
    }

    /// `Some(inner)` for `(some v)`, `None` for `none`, otherwise the value
    /// itself as a non-optional.
    pub fn into_optional(self) -> Option<Self> {
        match self {
            Self::OptionalNone => None,
            Self::OptionalSome(inner) => Some(*inner),
            other => Some(other),
        }
    }

    pub fn as_tuple(&self) -> Option<&BTreeMap<String, ClarityValue>> {
        match self {
            Self::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text form of strings, buffers (lowercase hex) and principals
    /// (c32check address, with `.name` for contracts).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::StringAscii(s) | Self::StringUtf8(s) => Some(s.clone()),
            Self::Buffer(b) => Some(hex::encode(b)),
            Self::StandardPrincipal { version, hash160 } => {
                Some(c32::c32_address(*version, hash160))
            }
            Self::ContractPrincipal {
                version,
                hash160,
                name,
            } => Some(format!("{}.{}", c32::c32_address(*version, hash160), name)),
            _ => None,
        }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ClarityError> {
        match self {
            Self::Int(v) => {
                out.push(0x00);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::UInt(v) => {
                out.push(0x01);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::Buffer(b) => {
                out.push(0x02);
                write_len_prefixed(out, b);
            }
            Self::Bool(true) => out.push(0x03),
            Self::Bool(false) => out.push(0x04),
            Self::StandardPrincipal { version, hash160 } => {
                out.push(0x05);
                out.push(*version);
                out.extend_from_slice(hash160);
            }
            Self::ContractPrincipal {
                version,
                hash160,
                name,
            } => {
                out.push(0x06);
                out.push(*version);
                out.extend_from_slice(hash160);
                write_name(out, name)?;
            }
            Self::ResponseOk(inner) => {
                out.push(0x07);
                inner.write(out)?;
            }
            Self::ResponseErr(inner) => {
                out.push(0x08);
                inner.write(out)?;
            }
            Self::OptionalNone => out.push(0x09),
            Self::OptionalSome(inner) => {
                out.push(0x0a);
                inner.write(out)?;
            }
            Self::List(items) => {
                out.push(0x0b);
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.write(out)?;
                }
            }
            Self::Tuple(fields) => {
                out.push(0x0c);
                out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
                for (name, value) in fields {
                    write_name(out, name)?;
                    value.write(out)?;
                }
            }
            Self::StringAscii(s) => {
                out.push(0x0d);
                write_len_prefixed(out, s.as_bytes());
            }
            Self::StringUtf8(s) => {
                out.push(0x0e);
                write_len_prefixed(out, s.as_bytes());
            }
        }
        Ok(())
    }
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn write_name(out: &mut Vec<u8>, name: &str) -> Result<(), ClarityError> {
    let len = u8::try_from(name.len())
        .ok()
        .filter(|l| *l <= 128)
        .ok_or(ClarityError::NameTooLong)?;
    out.push(len);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClarityError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ClarityError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn u128_bytes(&mut self) -> Result<[u8; 16], ClarityError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn hash160(&mut self) -> Result<[u8; 20], ClarityError> {
        let mut buf = [0u8; 20];
        buf.copy_from_slice(self.take(20)?);
        Ok(buf)
    }

    fn len_prefixed(&mut self) -> Result<&'a [u8], ClarityError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn name(&mut self) -> Result<String, ClarityError> {
        let len = self.byte()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::Utf8("name"))
    }

    fn value(&mut self, depth: usize) -> Result<ClarityValue, ClarityError> {
        if depth > MAX_DEPTH {
            return Err(ClarityError::TooDeep);
        }
        let prefix = self.byte()?;
        let value = match prefix {
            0x00 => ClarityValue::Int(i128::from_be_bytes(self.u128_bytes()?)),
            0x01 => ClarityValue::UInt(u128::from_be_bytes(self.u128_bytes()?)),
            0x02 => ClarityValue::Buffer(self.len_prefixed()?.to_vec()),
            0x03 => ClarityValue::Bool(true),
            0x04 => ClarityValue::Bool(false),
            0x05 => ClarityValue::StandardPrincipal {
                version: self.byte()?,
                hash160: self.hash160()?,
            },
            0x06 => ClarityValue::ContractPrincipal {
                version: self.byte()?,
                hash160: self.hash160()?,
                name: self.name()?,
            },
            0x07 => ClarityValue::ResponseOk(Box::new(self.value(depth + 1)?)),
            0x08 => ClarityValue::ResponseErr(Box::new(self.value(depth + 1)?)),
            0x09 => ClarityValue::OptionalNone,
            0x0a => ClarityValue::OptionalSome(Box::new(self.value(depth + 1)?)),
            0x0b => {
                let len = self.u32()? as usize;
                // Each element takes at least one byte.
                if len > self.bytes.len() - self.pos {
                    return Err(ClarityError::UnexpectedEof(self.pos));
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            0x0c => {
                let len = self.u32()?;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let name = self.name()?;
                    let value = self.value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(fields)
            }
            0x0d => {
                let raw = self.len_prefixed()?;
                if !raw.is_ascii() {
                    return Err(ClarityError::Utf8("string-ascii"));
                }
                ClarityValue::StringAscii(String::from_utf8_lossy(raw).into_owned())
            }
            0x0e => {
                let raw = self.len_prefixed()?;
                ClarityValue::StringUtf8(
                    String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::Utf8("string-utf8"))?,
                )
            }
            other => return Err(ClarityError::UnknownType(other)),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn buffer_argument_layout() {
        let hex = ClarityValue::Buffer(vec![0xab; 32]).to_hex().unwrap();
        assert!(hex.starts_with("0x0200000020abab"));
        assert_eq!(hex.len(), 2 + 2 * (1 + 4 + 32));
    }

    #[test]
    fn uint_layout() {
        let bytes = ClarityValue::UInt(1).to_bytes().unwrap();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[16], 0x01);
    }

    #[test]
    fn decodes_none() {
        assert_eq!(ClarityValue::from_hex("0x09").unwrap(), ClarityValue::OptionalNone);
    }

    #[test]
    fn decodes_ok_some_tuple() {
        let mut fields = BTreeMap::new();
        fields.insert("revoked".to_string(), ClarityValue::Bool(false));
        fields.insert("issued-at".to_string(), ClarityValue::UInt(1_700_000_000_000));
        fields.insert(
            "metadata-uri".to_string(),
            ClarityValue::StringUtf8("ipfs://Qm".into()),
        );
        let value = ClarityValue::ResponseOk(Box::new(ClarityValue::OptionalSome(Box::new(
            ClarityValue::Tuple(fields.clone()),
        ))));
        let decoded = ClarityValue::from_hex(&value.to_hex().unwrap()).unwrap();
        let inner = decoded.unwrap_response().into_optional().unwrap();
        assert_eq!(inner.as_tuple().unwrap(), &fields);
    }

    #[test]
    fn tuple_fields_are_sorted_on_the_wire() {
        let mut fields = BTreeMap::new();
        fields.insert("b".to_string(), ClarityValue::Bool(true));
        fields.insert("a".to_string(), ClarityValue::Bool(false));
        let bytes = ClarityValue::Tuple(fields).to_bytes().unwrap();
        assert_eq!(bytes, vec![0x0c, 0, 0, 0, 2, 1, b'a', 0x04, 1, b'b', 0x03]);
    }

    #[test]
    fn principal_text_is_c32() {
        let hash = hex::decode("a46ff88886c2ef9762d970b4d2c63678835bd39d").unwrap();
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(&hash);
        let p = ClarityValue::StandardPrincipal {
            version: 22,
            hash160,
        };
        assert_eq!(
            p.as_text().unwrap(),
            "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7"
        );
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(
            ClarityValue::from_hex("0x01000000"),
            Err(ClarityError::UnexpectedEof(_))
        ));
        assert!(matches!(
            ClarityValue::from_hex("0x02000000ff00"),
            Err(ClarityError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn rejects_trailing_bytes_and_unknown_prefix() {
        assert_eq!(
            ClarityValue::from_hex("0x0909"),
            Err(ClarityError::TrailingBytes(1))
        );
        assert_eq!(
            ClarityValue::from_hex("0x7f"),
            Err(ClarityError::UnknownType(0x7f))
        );
    }

    #[test]
    fn rejects_huge_list_length_without_allocating() {
        assert!(ClarityValue::from_hex("0x0bffffffff").is_err());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let hex = format!("0x{}09", "0a".repeat(MAX_DEPTH + 2));
        assert_eq!(ClarityValue::from_hex(&hex), Err(ClarityError::TooDeep));
    }

    fn leaf() -> impl Strategy<Value = ClarityValue> {
        prop_oneof![
            any::<i128>().prop_map(ClarityValue::Int),
            any::<u128>().prop_map(ClarityValue::UInt),
            any::<bool>().prop_map(ClarityValue::Bool),
            proptest::collection::vec(any::<u8>(), 0..40).prop_map(ClarityValue::Buffer),
            "[ -~]{0,20}".prop_map(ClarityValue::StringAscii),
            "\\PC{0,10}".prop_map(ClarityValue::StringUtf8),
            Just(ClarityValue::OptionalNone),
        ]
    }

    fn value() -> impl Strategy<Value = ClarityValue> {
        leaf().prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|v| ClarityValue::OptionalSome(Box::new(v))),
                inner.clone().prop_map(|v| ClarityValue::ResponseOk(Box::new(v))),
                proptest::collection::vec(inner.clone(), 0..4).prop_map(ClarityValue::List),
                proptest::collection::btree_map("[a-z-]{1,12}", inner, 0..4)
                    .prop_map(ClarityValue::Tuple),
            ]
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(v in value()) {
            let bytes = v.to_bytes().unwrap();
            prop_assert_eq!(ClarityValue::from_bytes(&bytes).unwrap(), v);
        }

        #[test]
        fn decoder_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = ClarityValue::from_bytes(&bytes);
        }
    }
}

//! Crockford base-32 (`c32`) encoding and c32check Stacks addresses.
//!
//! An address is `S` + the version character + `c32(hash160 ++ checksum)`,
//! where the checksum is the first four bytes of
//! `sha256(sha256(version ++ hash160))`.

use sha2::{Digest, Sha256};
use thiserror::Error;

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-signature address version (`SP…`).
pub const MAINNET_SINGLESIG: u8 = 22;
/// Testnet single-signature address version (`ST…`).
pub const TESTNET_SINGLESIG: u8 = 26;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum C32Error {
    #[error("invalid c32 character {0:?}")]
    InvalidCharacter(char),
    #[error("address must start with 'S'")]
    MissingPrefix,
    #[error("address too short")]
    TooShort,
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("address version {0} out of range")]
    BadVersion(u8),
}

/// Encode bytes as c32, preserving leading zero bytes as leading `0`s.
pub fn c32_encode(input: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for &byte in input.iter().rev() {
        let byte = u16::from(byte);
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1 << low_bits_to_take) - 1);
        out.push(ALPHABET[((low_bits << carry_bits) + carry) as usize]);
        carry_bits += 3;
        carry = byte >> (8 - carry_bits);
        if carry_bits >= 5 {
            out.push(ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }
    if carry_bits > 0 {
        out.push(ALPHABET[carry as usize]);
    }

    while out.last() == Some(&ALPHABET[0]) {
        out.pop();
    }
    for _ in input.iter().take_while(|b| **b == 0) {
        out.push(ALPHABET[0]);
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Decode c32 text. Lowercase input is accepted; `O`, `I` and `L` are read
/// as their look-alike digits.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let digits = input
        .chars()
        .map(digit_value)
        .collect::<Result<Vec<u8>, _>>()?;

    let mut out = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;
    for &digit in digits.iter().rev() {
        carry += u16::from(digit) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    for _ in digits.iter().take_while(|d| **d == 0) {
        out.push(0);
    }

    out.reverse();
    Ok(out)
}

fn digit_value(c: char) -> Result<u8, C32Error> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    ALPHABET
        .iter()
        .position(|a| char::from(*a) == normalized)
        .map(|p| p as u8)
        .ok_or(C32Error::InvalidCharacter(c))
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let first = hasher.finalize();
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// Render a principal as a c32check address.
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> String {
    let mut payload = hash160.to_vec();
    payload.extend_from_slice(&checksum(version, hash160));
    format!(
        "S{}{}",
        char::from(ALPHABET[usize::from(version & 0x1f)]),
        c32_encode(&payload)
    )
}

/// Parse a c32check address back into `(version, hash160)`.
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20]), C32Error> {
    let rest = address.strip_prefix('S').ok_or(C32Error::MissingPrefix)?;
    let mut chars = rest.chars();
    let version_char = chars.next().ok_or(C32Error::TooShort)?;
    let version = digit_value(version_char)?;
    if version >= 32 {
        return Err(C32Error::BadVersion(version));
    }
    let payload = c32_decode(chars.as_str())?;
    if payload.len() != 24 {
        return Err(C32Error::TooShort);
    }
    let (hash, check) = payload.split_at(20);
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(hash);
    if checksum(version, &hash160) != check {
        return Err(C32Error::BadChecksum);
    }
    Ok((version, hash160))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HASH: &str = "a46ff88886c2ef9762d970b4d2c63678835bd39d";

    fn hash160() -> [u8; 20] {
        let mut out = [0u8; 20];
        hex::decode_to_slice(HASH, &mut out).unwrap();
        out
    }

    #[test]
    fn mainnet_address() {
        assert_eq!(
            c32_address(MAINNET_SINGLESIG, &hash160()),
            "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7"
        );
    }

    #[test]
    fn testnet_address_prefix() {
        let addr = c32_address(TESTNET_SINGLESIG, &hash160());
        assert!(addr.starts_with("ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKK"));
        assert_eq!(c32_address_decode(&addr).unwrap(), (TESTNET_SINGLESIG, hash160()));
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let addr = c32_address(MAINNET_SINGLESIG, &hash160());
        let mut tampered: Vec<char> = addr.chars().collect();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();
        assert!(c32_address_decode(&tampered).is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(c32_address_decode("XP123"), Err(C32Error::MissingPrefix));
        assert!(matches!(
            c32_address_decode("SP!!!"),
            Err(C32Error::InvalidCharacter('!'))
        ));
    }

    #[test]
    fn leading_zero_bytes_survive() {
        let encoded = c32_encode(&[0, 0, 1]);
        assert!(encoded.starts_with("00"));
        assert_eq!(c32_decode(&encoded).unwrap(), vec![0, 0, 1]);
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..48)) {
            prop_assert_eq!(c32_decode(&c32_encode(&bytes)).unwrap(), bytes);
        }

        #[test]
        fn address_round_trip(version in 0u8..32, hash in proptest::array::uniform20(any::<u8>())) {
            let addr = c32_address(version, &hash);
            prop_assert_eq!(c32_address_decode(&addr).unwrap(), (version, hash));
        }
    }
}

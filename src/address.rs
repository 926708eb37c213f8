//! Algorand account addresses

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

use crate::AlgoXzenError;

/// Length of a base32 account string (32-byte key + 4-byte checksum)
pub const ADDRESS_LEN: usize = 58;

const CHECKSUM_LEN: usize = 4;

/// A validated account address.
///
/// The string form is the base32 (no padding) encoding of the 32-byte
/// public key followed by the last four bytes of its SHA-512/256 digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    text: String,
    key: [u8; 32],
}

impl Address {
    pub fn from_public_key(key: [u8; 32]) -> Self {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&key);
        raw.extend_from_slice(&checksum(&key));
        Self {
            text: BASE32_NOPAD.encode(&raw),
            key,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.key
    }

    /// For compile-time constants known to be well formed
    pub(crate) fn from_str_unchecked(s: &str) -> Self {
        debug_assert!(Self::is_valid(s));
        decode(s).unwrap_or_else(|| Self::from_public_key([0u8; 32]))
    }

    /// True when `s` is a well-formed address with a matching checksum
    pub fn is_valid(s: &str) -> bool {
        decode(s).is_some()
    }

    /// Shortened form for notices, e.g. `ABCDEF...WXYZ`
    pub fn short(&self) -> String {
        format!(
            "{}...{}",
            &self.text[..6],
            &self.text[ADDRESS_LEN - CHECKSUM_LEN..]
        )
    }
}

fn checksum(key: &[u8; 32]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

fn decode(s: &str) -> Option<Address> {
    if s.len() != ADDRESS_LEN || !s.bytes().all(is_base32_char) {
        return None;
    }
    let raw = BASE32_NOPAD.decode(s.as_bytes()).ok()?;
    let (key, sum) = raw.split_at(32);
    let key: [u8; 32] = key.try_into().ok()?;
    if sum != checksum(&key) {
        return None;
    }
    Some(Address {
        text: s.to_string(),
        key,
    })
}

pub(crate) fn is_base32_char(b: u8) -> bool {
    b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)
}

impl FromStr for Address {
    type Err = AlgoXzenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s.trim()).ok_or_else(|| {
            AlgoXzenError::invalid_input(format!("Invalid account address: {:?}", s))
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
    const ONES: &str = "AEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEA5RCDXMI";

    #[test]
    fn test_parse_valid() {
        let addr: Address = ZERO.parse().unwrap();
        assert_eq!(addr.as_str(), ZERO);
        assert_eq!(addr.public_key(), &[0u8; 32]);
        assert_eq!(addr.short(), "AAAAAA...HFKQ");
    }

    #[test]
    fn test_public_key_round_trip() {
        let addr = Address::from_public_key([1u8; 32]);
        assert_eq!(addr.as_str(), ONES);
        assert_eq!(ONES.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_rejects_bad_shape() {
        assert!("short".parse::<Address>().is_err());
        // lowercase and digits outside 2-7 are not base32
        assert!(ZERO.to_lowercase().parse::<Address>().is_err());
        let with_one = format!("1{}", &ZERO[1..]);
        assert!(with_one.parse::<Address>().is_err());
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let flipped = format!("{}AAAA", &ZERO[..ADDRESS_LEN - 4]);
        assert!(!Address::is_valid(&flipped));
        assert!("B".repeat(ADDRESS_LEN).parse::<Address>().is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Address, _> = serde_json::from_str(&format!("\"{}\"", ZERO));
        assert!(ok.is_ok());
        let bad: Result<Address, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}

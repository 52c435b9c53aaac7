use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit SHA-256 digest, used to identify transactions and blocks alike.
///
/// Wire encodings always carry a `Hash256` as a lowercase hex string; the
/// [`Serialize`]/[`Deserialize`] impls below encode/decode that form
/// directly rather than falling back to serde's default byte-array shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the SHA-256 digest of `data`.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        Self(hash)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        let bytes = hex::decode(s).map_err(|_| HashParseError::NotHex)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashParseError::WrongLength)?;
        Ok(Self(array))
    }

    /// True when the first `difficulty` hex characters of this hash's hex
    /// representation are `'0'`. This is a character-granularity proof of
    /// work check, coarser than counting leading zero bits.
    #[must_use]
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        let hex = self.to_hex();
        hex.as_bytes()
            .iter()
            .take(difficulty)
            .all(|&byte| byte == b'0')
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("hash is not valid hex")]
    NotHex,
    #[error("hash must decode to exactly 32 bytes")]
    WrongLength,
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_displays_as_64_zero_chars() {
        let hash = Hash256::zero();
        let rendered = hash.to_string();
        assert_eq!(rendered.len(), 64);
        assert!(rendered.chars().all(|c| c == '0'));
    }

    #[test]
    fn sha256_is_deterministic_and_nonzero() {
        let a = Hash256::sha256(b"hello world");
        let b = Hash256::sha256(b"hello world");
        assert_eq!(a, b);
        assert_ne!(a, Hash256::zero());
    }

    #[test]
    fn difficulty_checks_leading_hex_characters_not_bits() {
        // Hash whose hex starts with two zero characters ("00..") but whose
        // second byte is 0x10 -- only 12 leading zero *bits*, yet 2 leading
        // zero hex *characters*.
        let mut bytes = [0xffu8; 32];
        bytes[0] = 0x00;
        bytes[1] = 0x10;
        let hash = Hash256::from_bytes(bytes);
        assert!(hash.meets_difficulty(2));
        assert!(!hash.meets_difficulty(3));
    }

    #[test]
    fn round_trips_through_hex() {
        let hash = Hash256::sha256(b"round trip");
        let parsed = Hash256::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn rejects_wrong_length_hex() {
        assert!(matches!(
            Hash256::from_hex("abcd"),
            Err(HashParseError::WrongLength)
        ));
    }
}

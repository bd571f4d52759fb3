//! Fingerprints for source text
//!
//! [`ContentHash`] identifies a fragment's source text. Persisted fragment
//! records carry it so a resumed conversion can tell whether a stored
//! translation still belongs to the fragment it is about to skip.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Blake3 digest of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash raw bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash UTF-8 text
    #[inline]
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::compute(text.as_bytes())
    }

    /// Underlying digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 16 hex characters, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors raised when reading a hash back from its hex form
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong digest length
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    /// Not hex
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHash::of_text("MOVE A TO B."), ContentHash::of_text("MOVE A TO B."));
        assert_ne!(ContentHash::of_text("MOVE A TO B."), ContentHash::of_text("MOVE B TO A."));
    }

    #[test]
    fn hash_hex_roundtrip() {
        let hash = ContentHash::of_text("IDENTIFICATION DIVISION.");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn hash_rejects_short_hex() {
        let result = "abcd".parse::<ContentHash>();
        assert!(matches!(result, Err(HashError::InvalidLength(2))));
    }

    #[test]
    fn hash_serializes_as_string() {
        let hash = ContentHash::of_text("x");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json.len(), 66);
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}

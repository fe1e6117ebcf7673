//! BLAKE3 hashes used to fingerprint build plans.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 hash (256 bits / 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The number of bytes in a hash
    pub const LEN: usize = 32;

    /// Compute BLAKE3 hash of data
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The all-zero hash, used as the seed of a chain
    #[must_use]
    pub const fn empty() -> Self {
        Self([0u8; 32])
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hash rendered by [`Hash::to_hex`]
    ///
    /// # Errors
    ///
    /// Returns error if the input is not hex or does not decode to 32 bytes
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(hex).map_err(|_| HashError::InvalidHex)?;
        if bytes.len() != Self::LEN {
            return Err(HashError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Chain this hash with another
    ///
    /// Computes: hash(self || other)
    #[must_use]
    pub fn chain(&self, other: &Hash) -> Self {
        let mut combined = [0u8; 64];
        combined[0..32].copy_from_slice(&self.0);
        combined[32..64].copy_from_slice(&other.0);
        Self::compute(&combined)
    }

    /// Chain this hash with the hash of `data`
    #[must_use]
    pub fn absorb(&self, data: &[u8]) -> Self {
        self.chain(&Self::compute(data))
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Invalid hex encoding
    InvalidHex,
    /// Invalid length (not 32 bytes)
    InvalidLength(usize),
}

impl std::error::Error for HashError {}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "fingerprint is not valid hex"),
            Self::InvalidLength(len) => {
                write!(f, "fingerprint is {} bytes, expected {}", len, Hash::LEN)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_compute() {
        let hash = Hash::compute(b"a1");
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash, Hash::compute(b"a1"));
        assert_ne!(hash, Hash::compute(b"a2"));
    }

    #[test]
    fn test_hash_from_hex() {
        let hash = Hash::compute(b"plan");
        assert_eq!(Hash::from_hex(&hash.to_hex()), Ok(hash));
        assert_eq!(Hash::from_hex("zz"), Err(HashError::InvalidHex));
        assert_eq!(Hash::from_hex("abcd"), Err(HashError::InvalidLength(2)));
        assert_eq!(
            HashError::InvalidLength(2).to_string(),
            "fingerprint is 2 bytes, expected 32"
        );
    }

    #[test]
    fn test_absorb_is_order_sensitive() {
        let ab = Hash::empty().absorb(b"a").absorb(b"b");
        let ba = Hash::empty().absorb(b"b").absorb(b"a");
        assert_ne!(ab, ba);
        assert_eq!(ab, Hash::empty().absorb(b"a").absorb(b"b"));
    }
}

//! Proof digest type using SHA-256.

use sha2::{Digest as _, Sha256};
use std::fmt;

/// A 32-byte SHA-256 digest.
///
/// The textual form is 64 lowercase hex digits. Difficulty is measured in
/// leading zero hex digits of that textual form, so the predicate works on
/// nibbles rather than bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Size of digest in bytes.
    pub const BYTES: usize = 32;

    /// Number of hex digits in the textual form.
    pub const HEX_LEN: usize = 64;

    /// Zero digest (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Max digest (all bytes are 0xFF).
    pub const MAX: Self = Self([0xFFu8; 32]);

    /// Hash arbitrary bytes with SHA-256.
    pub fn sha256(bytes: &[u8]) -> Self {
        let out = Sha256::digest(bytes);
        Self(out.into())
    }

    /// Wrap raw digest bytes (without hashing).
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse digest from hex string. Accepts either case.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        if hex.len() != Self::HEX_LEN {
            return Err(HexError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Convert digest to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Count leading zero hex digits (nibbles).
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0u32;
        for &byte in &self.0 {
            if byte == 0 {
                count += 2;
            } else {
                if byte < 0x10 {
                    count += 1;
                }
                break;
            }
        }
        count
    }

    /// Check if this is the zero digest.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Digest({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

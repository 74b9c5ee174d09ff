//! # Content Digest: Content-Addressed Fingerprints
//!
//! A document is fingerprinted by the SHA-256 of its raw bytes. The digest
//! is deterministic, has no failure modes, and is defined for the empty
//! buffer as well.
//!
//! The hex form is always lowercase; that string is what the record store
//! persists as `documentHash` and what the first half of a document code
//! is derived from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// A 32-byte SHA-256 content digest.
///
/// Serializes as a 64-char lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-char hex string (case-insensitive).
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(CoreError::InvalidDigest(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| CoreError::InvalidDigest(format!("{s:?}: {e}")))?;
        Ok(Self(out))
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the SHA-256 digest of raw content bytes.
pub fn sha256_digest(content: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(content);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute the lowercase hex SHA-256 of raw content bytes.
pub fn sha256_hex(content: &[u8]) -> String {
    sha256_digest(content).to_hex()
}

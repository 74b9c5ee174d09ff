//! # Timestamp Proof Format
//!
//! The serialized proof stored next to every document. It is
//! self-contained: the calendar that issued the commitment, the path from
//! the document digest to that commitment, and the commitment itself.
//! Nothing from the submission session is needed to resolve it later.
//!
//! ```json
//! {
//!   "version": 1,
//!   "hashAlgorithm": "sha256",
//!   "digest": "2cf24dba…",
//!   "pending": {
//!     "calendar": "https://calendar.example",
//!     "ops": [{"op": "append", "arg": "…"}, {"op": "sha256"}],
//!     "commitment": "…"
//!   }
//! }
//! ```

use notary_core::{ContentDigest, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ProofFormatError;
use crate::path::{evaluate, hex_bytes, PathOp};

/// Current proof format version.
pub const PROOF_VERSION: u32 = 1;

const HASH_ALGORITHM: &str = "sha256";

/// A commitment accepted by a calendar but not yet anchored in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommitment {
    /// Identifier (base URL) of the issuing calendar.
    #[serde(default)]
    pub calendar: String,
    /// Path from the document digest to `commitment`.
    pub ops: Vec<PathOp>,
    /// The calendar's commitment.
    #[serde(with = "hex_bytes")]
    pub commitment: Vec<u8>,
}

impl PendingCommitment {
    /// Check that `ops` evaluated over `digest` yields `commitment`.
    pub fn verify_from(&self, digest: &ContentDigest) -> Result<(), ProofFormatError> {
        let computed = evaluate(digest.as_bytes(), &self.ops)?;
        if computed != self.commitment {
            return Err(ProofFormatError::InconsistentCommitment);
        }
        Ok(())
    }

    /// Lowercase hex of the commitment, as used in calendar URLs.
    pub fn commitment_hex(&self) -> String {
        hex::encode(&self.commitment)
    }
}

/// A calendar's report that a commitment matured into a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAttestation {
    pub block_height: u64,
    pub block_time: Timestamp,
    /// Merkle root committed in the block header.
    pub merkle_root: ContentDigest,
    /// Path from the pending commitment to `merkle_root`.
    pub path: Vec<PathOp>,
}

/// The serialized, self-contained timestamp proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampProof {
    pub version: u32,
    pub hash_algorithm: String,
    /// Digest of the notarized content.
    pub digest: ContentDigest,
    pub pending: PendingCommitment,
}

impl TimestampProof {
    /// Wrap a pending commitment for `digest`, checking it is consistent.
    pub fn new(digest: ContentDigest, pending: PendingCommitment) -> Result<Self, ProofFormatError> {
        pending.verify_from(&digest)?;
        Ok(Self {
            version: PROOF_VERSION,
            hash_algorithm: HASH_ALGORITHM.to_string(),
            digest,
            pending,
        })
    }

    /// Serialize to the stored byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse and validate the stored byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofFormatError> {
        let proof: Self = serde_json::from_slice(bytes)
            .map_err(|e| ProofFormatError::Encoding(e.to_string()))?;
        if proof.version != PROOF_VERSION {
            return Err(ProofFormatError::UnsupportedVersion(proof.version));
        }
        if proof.hash_algorithm != HASH_ALGORITHM {
            return Err(ProofFormatError::UnsupportedAlgorithm(proof.hash_algorithm));
        }
        proof.pending.verify_from(&proof.digest)?;
        Ok(proof)
    }

    /// Evaluate the full path from the digest through `attestation.path`.
    ///
    /// Returns true when it lands on the attested Merkle root.
    pub fn reaches_root(&self, attestation: &CalendarAttestation) -> Result<bool, ProofFormatError> {
        let commitment = evaluate(self.digest.as_bytes(), &self.pending.ops)?;
        let root = evaluate(&commitment, &attestation.path)?;
        Ok(root.as_slice() == attestation.merkle_root.as_bytes())
    }
}

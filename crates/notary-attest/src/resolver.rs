//! # Proof Resolution
//!
//! Attempts to upgrade a pending proof into a confirmed block attestation.
//! Resolution is best-effort and retried by the caller, so it never
//! returns an error: every condition short of a verified confirmation is
//! reported as [`Outcome::Pending`] with a [`PendingReason`].
//!
//! `Confirmed` is only reported when
//! 1. the digest recomputed from the content equals the digest embedded in
//!    the proof, and
//! 2. evaluating the proof's pending path followed by the calendar's
//!    attestation path from that digest lands on the attested Merkle root.

use std::sync::Arc;
use std::time::Duration;

use notary_core::{sha256_digest, BlockAttestation};
use serde::{Deserialize, Serialize};

use crate::network::{AttestationNetwork, NetworkResolution};
use crate::proof::TimestampProof;

/// Why a resolution did not confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingReason {
    /// The commitment is known but not yet anchored.
    NotMatured,
    /// The network returned an error.
    Unavailable,
    /// The network did not answer within the timeout.
    Timeout,
    /// The stored proof bytes could not be interpreted.
    MalformedProof,
    /// The proof commits to a different digest than the content.
    DigestMismatch,
    /// The network's attestation path does not reach its Merkle root.
    RootMismatch,
}

impl PendingReason {
    /// True when the reason points at corrupted or tampered data rather
    /// than routine immaturity or unavailability.
    pub fn is_integrity_concern(&self) -> bool {
        matches!(
            self,
            Self::MalformedProof | Self::DigestMismatch | Self::RootMismatch
        )
    }
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotMatured => "NOT_MATURED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::MalformedProof => "MALFORMED_PROOF",
            Self::DigestMismatch => "DIGEST_MISMATCH",
            Self::RootMismatch => "ROOT_MISMATCH",
        };
        f.write_str(s)
    }
}

/// Result of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The content's commitment is anchored in a confirmed block.
    Confirmed(BlockAttestation),
    /// Not (yet) confirmed.
    Pending(PendingReason),
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// The pending reason, if any.
    pub fn pending_reason(&self) -> Option<PendingReason> {
        match self {
            Self::Pending(reason) => Some(*reason),
            Self::Confirmed(_) => None,
        }
    }
}

/// Resolves pending proofs against the attestation network.
#[derive(Clone)]
pub struct ProofResolver {
    network: Arc<dyn AttestationNetwork>,
    timeout: Duration,
}

impl ProofResolver {
    pub fn new(network: Arc<dyn AttestationNetwork>, timeout: Duration) -> Self {
        Self { network, timeout }
    }

    /// Resolve `proof_bytes` for `content`. Never fails.
    pub async fn resolve(&self, content: &[u8], proof_bytes: &[u8]) -> Outcome {
        let digest = sha256_digest(content);

        let proof = match TimestampProof::from_bytes(proof_bytes) {
            Ok(proof) => proof,
            Err(e) => {
                tracing::warn!(digest = %digest, error = %e, "stored proof is malformed");
                return Outcome::Pending(PendingReason::MalformedProof);
            }
        };

        if proof.digest != digest {
            tracing::warn!(
                digest = %digest,
                proof_digest = %proof.digest,
                "proof commits to a different digest than the content"
            );
            return Outcome::Pending(PendingReason::DigestMismatch);
        }

        let resolution =
            match tokio::time::timeout(self.timeout, self.network.resolve(&digest, &proof.pending))
                .await
            {
                Err(_) => {
                    tracing::info!(digest = %digest, timeout = ?self.timeout, "resolution timed out");
                    return Outcome::Pending(PendingReason::Timeout);
                }
                Ok(Err(e)) => {
                    tracing::info!(digest = %digest, error = %e, "attestation network unavailable");
                    return Outcome::Pending(PendingReason::Unavailable);
                }
                Ok(Ok(resolution)) => resolution,
            };

        let attestation = match resolution {
            NetworkResolution::Pending => {
                tracing::debug!(digest = %digest, "commitment not yet anchored");
                return Outcome::Pending(PendingReason::NotMatured);
            }
            NetworkResolution::Confirmed(attestation) => attestation,
        };

        match proof.reaches_root(&attestation) {
            Ok(true) => {
                tracing::info!(
                    digest = %digest,
                    height = attestation.block_height,
                    "proof confirmed in block"
                );
                Outcome::Confirmed(BlockAttestation {
                    digest,
                    block_height: attestation.block_height,
                    block_time: attestation.block_time,
                    merkle_root: attestation.merkle_root,
                })
            }
            Ok(false) => {
                tracing::warn!(
                    digest = %digest,
                    height = attestation.block_height,
                    "attestation path does not reach the attested merkle root"
                );
                Outcome::Pending(PendingReason::RootMismatch)
            }
            Err(e) => {
                tracing::warn!(digest = %digest, error = %e, "attestation path is malformed");
                Outcome::Pending(PendingReason::RootMismatch)
            }
        }
    }
}

impl std::fmt::Debug for ProofResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofResolver")
            .field("network", &self.network.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

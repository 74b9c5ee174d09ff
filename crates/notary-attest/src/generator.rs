//! # Proof Generation
//!
//! Digest the content, submit the digest to the attestation network and
//! wrap the returned pending commitment into a serialized
//! [`TimestampProof`]. Any failure is a [`ProofSubmissionError`]; an upload
//! must not proceed without a generated proof.

use std::sync::Arc;
use std::time::Duration;

use notary_core::{sha256_digest, ContentDigest};

use crate::error::ProofSubmissionError;
use crate::network::AttestationNetwork;
use crate::proof::TimestampProof;

/// A freshly generated pending proof.
#[derive(Debug, Clone)]
pub struct GeneratedProof {
    /// Digest of the submitted content.
    pub digest: ContentDigest,
    /// Serialized [`TimestampProof`].
    pub bytes: Vec<u8>,
}

/// Submits content digests and produces pending proofs.
#[derive(Clone)]
pub struct ProofGenerator {
    network: Arc<dyn AttestationNetwork>,
    timeout: Duration,
}

impl ProofGenerator {
    pub fn new(network: Arc<dyn AttestationNetwork>, timeout: Duration) -> Self {
        Self { network, timeout }
    }

    /// Generate a pending proof for `content`.
    pub async fn generate(&self, content: &[u8]) -> Result<GeneratedProof, ProofSubmissionError> {
        let digest = sha256_digest(content);
        let pending = tokio::time::timeout(self.timeout, self.network.submit(&digest))
            .await
            .map_err(|_| ProofSubmissionError::Timeout(self.timeout))??;

        let proof = TimestampProof::new(digest, pending)?;
        let bytes = proof.to_bytes()?;
        tracing::info!(
            digest = %digest,
            calendar = %proof.pending.calendar,
            "generated pending timestamp proof"
        );
        Ok(GeneratedProof { digest, bytes })
    }
}

impl std::fmt::Debug for ProofGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofGenerator")
            .field("network", &self.network.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

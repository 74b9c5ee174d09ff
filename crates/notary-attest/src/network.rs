//! # Attestation Network Boundary
//!
//! The notary consumes the timestamp network as an opaque capability:
//! submit a digest now, later ask whether the resulting commitment has
//! matured into a block-anchored attestation.
//!
//! Implementations are injected as `Arc<dyn AttestationNetwork>`. Callers
//! own timeouts; implementations may retry internally but must not
//! block indefinitely on their own.

use async_trait::async_trait;
use notary_core::ContentDigest;

use crate::error::AttestationError;
use crate::proof::{CalendarAttestation, PendingCommitment};

/// Answer of the network to a resolution query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkResolution {
    /// The commitment is known but no confirming block exists yet.
    Pending,
    /// The commitment is anchored in a block.
    Confirmed(CalendarAttestation),
}

/// A calendar-style attestation network.
#[async_trait]
pub trait AttestationNetwork: Send + Sync {
    /// Identifier of this network endpoint, recorded in proofs.
    fn name(&self) -> &str;

    /// Submit a digest for aggregation into the next anchored block.
    async fn submit(&self, digest: &ContentDigest) -> Result<PendingCommitment, AttestationError>;

    /// Ask whether a pending commitment has matured.
    async fn resolve(
        &self,
        digest: &ContentDigest,
        pending: &PendingCommitment,
    ) -> Result<NetworkResolution, AttestationError>;
}

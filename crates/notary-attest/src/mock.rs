//! # Mock Calendar
//!
//! In-process calendar for development and testing. Commitments are
//! salted with a random nonce exactly like a real calendar, held pending
//! until [`MockCalendar::mine_block()`] aggregates them into a real Merkle
//! tree, and resolved from the recorded attestations afterwards.
//!
//! ## Fault injection
//!
//! - [`set_unavailable`](MockCalendar::set_unavailable): every call fails.
//! - [`set_reject_submissions`](MockCalendar::set_reject_submissions):
//!   submissions are refused, resolution still works.
//! - [`hang`](MockCalendar::hang): resolution for one digest never
//!   returns, so the caller's timeout fires.
//!
//! ## Warning
//!
//! Provides NO actual blockchain anchoring.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use notary_core::{ContentDigest, Timestamp};
use parking_lot::Mutex;

use crate::error::AttestationError;
use crate::network::{AttestationNetwork, NetworkResolution};
use crate::path::{evaluate, MerkleTree, PathOp};
use crate::proof::{CalendarAttestation, PendingCommitment};

#[derive(Debug, Default)]
struct MockState {
    pending: Vec<Vec<u8>>,
    attested: HashMap<Vec<u8>, CalendarAttestation>,
    hanging: HashSet<ContentDigest>,
    unavailable: bool,
    reject_submissions: bool,
}

/// In-process calendar with fault injection.
#[derive(Debug)]
pub struct MockCalendar {
    name: String,
    state: Mutex<MockState>,
    submissions: AtomicU64,
    resolutions: AtomicU64,
}

impl MockCalendar {
    /// Create a new mock calendar.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState::default()),
            submissions: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
        }
    }

    /// Anchor every pending commitment in a block at `height`.
    ///
    /// Returns the number of commitments anchored; zero leaves no block.
    pub fn mine_block(&self, height: u64, block_time: Timestamp) -> usize {
        let mut state = self.state.lock();
        let leaves = std::mem::take(&mut state.pending);
        let Some(tree) = MerkleTree::build(leaves.clone()) else {
            return 0;
        };
        let mut root = [0u8; 32];
        root.copy_from_slice(tree.root());
        let merkle_root = ContentDigest::from_bytes(root);

        for (i, leaf) in leaves.into_iter().enumerate() {
            let path = tree.path(i).unwrap_or_default();
            state.attested.insert(
                leaf,
                CalendarAttestation {
                    block_height: height,
                    block_time,
                    merkle_root,
                    path,
                },
            );
        }
        tracing::debug!(height, leaves = tree.len(), root = %merkle_root, "mock calendar mined block");
        tree.len()
    }

    /// Make every call fail with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Refuse submissions while set.
    pub fn set_reject_submissions(&self, reject: bool) {
        self.state.lock().reject_submissions = reject;
    }

    /// Make resolution of `digest` hang forever.
    pub fn hang(&self, digest: ContentDigest) {
        self.state.lock().hanging.insert(digest);
    }

    /// Number of commitments awaiting a block.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of accepted submissions.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Number of resolution queries received.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestationNetwork for MockCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, digest: &ContentDigest) -> Result<PendingCommitment, AttestationError> {
        let nonce: [u8; 16] = rand::random();
        let ops = vec![PathOp::Append(nonce.to_vec()), PathOp::Sha256];
        let commitment = evaluate(digest.as_bytes(), &ops)
            .map_err(|e| AttestationError::Rejected(e.to_string()))?;

        let mut state = self.state.lock();
        if state.unavailable {
            return Err(AttestationError::Unavailable(self.name.clone()));
        }
        if state.reject_submissions {
            return Err(AttestationError::Rejected(format!(
                "{} is not accepting submissions",
                self.name
            )));
        }
        state.pending.push(commitment.clone());
        self.submissions.fetch_add(1, Ordering::SeqCst);

        Ok(PendingCommitment {
            calendar: self.name.clone(),
            ops,
            commitment,
        })
    }

    async fn resolve(
        &self,
        digest: &ContentDigest,
        pending: &PendingCommitment,
    ) -> Result<NetworkResolution, AttestationError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let hanging = {
            let state = self.state.lock();
            if state.unavailable {
                return Err(AttestationError::Unavailable(self.name.clone()));
            }
            state.hanging.contains(digest)
        };
        if hanging {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock();
        Ok(match state.attested.get(&pending.commitment) {
            Some(attestation) => NetworkResolution::Confirmed(attestation.clone()),
            None => NetworkResolution::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::TimestampProof;
    use notary_core::sha256_digest;

    fn block_time() -> Timestamp {
        Timestamp::from_epoch_secs(1_690_000_000).unwrap()
    }

    #[tokio::test]
    async fn submit_then_pending_until_mined() {
        let cal = MockCalendar::new("mock");
        let digest = sha256_digest(b"hello");
        let pending = cal.submit(&digest).await.unwrap();
        pending.verify_from(&digest).unwrap();
        assert_eq!(cal.pending_len(), 1);

        assert_eq!(cal.resolve(&digest, &pending).await.unwrap(), NetworkResolution::Pending);

        assert_eq!(cal.mine_block(800_000, block_time()), 1);
        assert_eq!(cal.pending_len(), 0);
        match cal.resolve(&digest, &pending).await.unwrap() {
            NetworkResolution::Confirmed(a) => assert_eq!(a.block_height, 800_000),
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mined_paths_reach_the_root() {
        let cal = MockCalendar::new("mock");
        let mut proofs = Vec::new();
        for i in 0..5u8 {
            let digest = sha256_digest(&[i]);
            let pending = cal.submit(&digest).await.unwrap();
            proofs.push(TimestampProof::new(digest, pending).unwrap());
        }
        cal.mine_block(1, block_time());
        for proof in &proofs {
            let NetworkResolution::Confirmed(a) = cal.resolve(&proof.digest, &proof.pending).await.unwrap()
            else {
                panic!("expected confirmation");
            };
            assert!(proof.reaches_root(&a).unwrap());
        }
    }

    #[tokio::test]
    async fn same_digest_gets_distinct_commitments() {
        let cal = MockCalendar::new("mock");
        let digest = sha256_digest(b"dup");
        let a = cal.submit(&digest).await.unwrap();
        let b = cal.submit(&digest).await.unwrap();
        assert_ne!(a.commitment, b.commitment);
        assert_eq!(cal.submissions(), 2);
    }

    #[tokio::test]
    async fn unavailable_fails_every_call() {
        let cal = MockCalendar::new("mock");
        let digest = sha256_digest(b"x");
        let pending = cal.submit(&digest).await.unwrap();
        cal.set_unavailable(true);
        assert!(matches!(cal.submit(&digest).await, Err(AttestationError::Unavailable(_))));
        assert!(cal.resolve(&digest, &pending).await.is_err());
        cal.set_unavailable(false);
        assert!(cal.resolve(&digest, &pending).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_submissions() {
        let cal = MockCalendar::new("mock");
        cal.set_reject_submissions(true);
        assert!(matches!(
            cal.submit(&sha256_digest(b"x")).await,
            Err(AttestationError::Rejected(_))
        ));
        assert_eq!(cal.submissions(), 0);
    }

    #[tokio::test]
    async fn hanging_digest_never_resolves() {
        let cal = MockCalendar::new("mock");
        let digest = sha256_digest(b"slow");
        let pending = cal.submit(&digest).await.unwrap();
        cal.hang(digest);
        let res = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            cal.resolve(&digest, &pending),
        )
        .await;
        assert!(res.is_err(), "resolution should hang");
    }

    #[test]
    fn mining_empty_calendar_is_noop() {
        let cal = MockCalendar::new("mock");
        assert_eq!(cal.mine_block(1, block_time()), 0);
    }
}

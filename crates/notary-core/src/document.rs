//! # Document Lifecycle Data Model
//!
//! A `Document` is created at upload in `STAMPING` and moves at most once
//! to the terminal `CONFIRMED` state. Its `lifecycle` is an append-only log
//! of verification observations.
//!
//! ## Invariants
//!
//! - `status == CONFIRMED` ⟺ `timeline.confirmed_at.is_some()` ⟺ the
//!   lifecycle contains exactly one `TIMESTAMP_CONFIRMED` entry.
//! - Lifecycle timestamps are non-decreasing in insertion order.
//! - Timeline timestamps never precede `uploaded_at`.
//!
//! [`Document::check_invariants()`] verifies all three.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::code::{BlobRef, DocumentCode};
use crate::digest::ContentDigest;
use crate::error::CoreError;
use crate::temporal::Timestamp;

/// Document status. `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Proof submitted, not yet anchored in a block.
    Stamping,
    /// Proof anchored in a confirmed block (terminal).
    Confirmed,
}

impl DocumentStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Wire name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stamping => "STAMPING",
            Self::Confirmed => "CONFIRMED",
        }
    }

    /// Parse the persisted wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STAMPING" => Some(Self::Stamping),
            "CONFIRMED" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    /// A reconciliation pass found the proof not yet confirmed.
    VerificationPending,
    /// The document moved to CONFIRMED. Appears at most once.
    TimestampConfirmed,
    /// An on-demand validation found the proof not yet confirmed.
    VerificationCheck,
}

impl LifecycleEvent {
    /// Wire name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationPending => "VERIFICATION_PENDING",
            Self::TimestampConfirmed => "TIMESTAMP_CONFIRMED",
            Self::VerificationCheck => "VERIFICATION_CHECK",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of a document's lifecycle log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub event: LifecycleEvent,
    pub timestamp: Timestamp,
}

impl LifecycleEntry {
    pub fn new(event: LifecycleEvent, timestamp: Timestamp) -> Self {
        Self { event, timestamp }
    }
}

/// Document timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub uploaded_at: Timestamp,
    pub stamping_started_at: Timestamp,
    /// Set exactly once, at the STAMPING → CONFIRMED transition.
    pub confirmed_at: Option<Timestamp>,
    /// Only ever advances.
    pub last_verification_at: Timestamp,
}

impl Timeline {
    /// Timeline of a freshly uploaded document.
    pub fn started(at: Timestamp) -> Self {
        Self {
            uploaded_at: at,
            stamping_started_at: at,
            confirmed_at: None,
            last_verification_at: at,
        }
    }

    /// Advance `last_verification_at`, never moving it backwards.
    pub fn observe_verification(&mut self, at: Timestamp) {
        if at > self.last_verification_at {
            self.last_verification_at = at;
        }
    }
}

/// Details of the block that anchors a document's commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAttestation {
    /// The document digest the attestation commits to.
    pub digest: ContentDigest,
    /// Height of the anchoring block.
    pub block_height: u64,
    /// Block header time.
    pub block_time: Timestamp,
    /// Merkle root committed in the block header.
    pub merkle_root: ContentDigest,
}

impl BlockAttestation {
    /// Public block-explorer link for the anchoring block.
    pub fn explorer_url(&self) -> String {
        format!("https://blockstream.info/block-height/{}", self.block_height)
    }
}

/// A notarized document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub code: DocumentCode,
    pub document_hash: ContentDigest,
    pub status: DocumentStatus,
    pub timeline: Timeline,
    #[serde(default)]
    pub lifecycle: Vec<LifecycleEntry>,
    pub content_ref: BlobRef,
    pub proof_ref: BlobRef,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Recorded together with the CONFIRMED transition.
    #[serde(default)]
    pub attestation: Option<BlockAttestation>,
}

impl Document {
    /// A freshly uploaded document in `STAMPING` with an empty lifecycle.
    pub fn new_stamping(
        code: DocumentCode,
        document_hash: ContentDigest,
        content_ref: BlobRef,
        proof_ref: BlobRef,
        at: Timestamp,
    ) -> Self {
        Self {
            code,
            document_hash,
            status: DocumentStatus::Stamping,
            timeline: Timeline::started(at),
            lifecycle: Vec::new(),
            content_ref,
            proof_ref,
            filename: None,
            metadata: BTreeMap::new(),
            attestation: None,
        }
    }

    /// Number of `TIMESTAMP_CONFIRMED` entries in the lifecycle.
    pub fn confirmation_count(&self) -> usize {
        self.lifecycle
            .iter()
            .filter(|e| e.event == LifecycleEvent::TimestampConfirmed)
            .count()
    }

    /// Append a lifecycle entry, clamping its timestamp so the log stays
    /// non-decreasing, and advance `last_verification_at` to it.
    ///
    /// Returns the entry as stored.
    pub fn append_entry(&mut self, entry: LifecycleEntry) -> LifecycleEntry {
        let floor = self.lifecycle.last().map(|e| e.timestamp);
        let timestamp = match floor {
            Some(prev) if prev > entry.timestamp => prev,
            _ => entry.timestamp,
        };
        let stored = LifecycleEntry::new(entry.event, timestamp);
        self.lifecycle.push(stored);
        self.timeline.observe_verification(timestamp);
        stored
    }

    /// Verify the lifecycle invariants.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let fail = |reason: String| {
            Err(CoreError::InvariantViolation {
                code: self.code.to_string(),
                reason,
            })
        };

        let confirmed = self.status == DocumentStatus::Confirmed;
        let count = self.confirmation_count();
        if confirmed != self.timeline.confirmed_at.is_some() {
            return fail(format!(
                "status {} disagrees with confirmedAt {:?}",
                self.status, self.timeline.confirmed_at
            ));
        }
        if count != usize::from(confirmed) {
            return fail(format!(
                "status {} with {count} TIMESTAMP_CONFIRMED events",
                self.status
            ));
        }
        if let Some(pair) = self
            .lifecycle
            .windows(2)
            .find(|w| w[1].timestamp < w[0].timestamp)
        {
            return fail(format!(
                "lifecycle out of order: {} after {}",
                pair[1].timestamp, pair[0].timestamp
            ));
        }
        if self.timeline.last_verification_at < self.timeline.uploaded_at {
            return fail("lastVerificationAt precedes uploadedAt".into());
        }
        Ok(())
    }
}

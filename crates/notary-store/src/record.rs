//! # Record Store
//!
//! Persistence of [`Document`] records. Besides plain get/put, a record
//! store provides the two mutation primitives the lifecycle engine needs:
//!
//! - [`RecordStore::compare_and_set_status`]: apply a [`StatusTransition`]
//!   only if the stored status still equals the expected pre-state. Two
//!   concurrent callers racing the same transition get exactly one `true`.
//! - [`RecordStore::append_lifecycle_event`]: append to the lifecycle log
//!   without losing concurrent appends.
//!
//! Both also advance `timeline.last_verification_at`, never moving it
//! backwards.

use async_trait::async_trait;
use notary_core::{
    BlockAttestation, Document, DocumentCode, DocumentStatus, LifecycleEntry, LifecycleEvent,
    Timestamp,
};

use crate::error::StoreError;

/// A compare-and-swap status change: `expected` in, `next` out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub expected: DocumentStatus,
    pub next: DocumentStatus,
    /// Time of the transition. Becomes `confirmed_at` when `next` is terminal.
    pub at: Timestamp,
    /// Lifecycle event recorded together with the status change.
    pub event: LifecycleEvent,
    /// Attestation recorded together with the status change.
    pub attestation: Option<BlockAttestation>,
}

impl StatusTransition {
    /// STAMPING → CONFIRMED with the anchoring block's attestation.
    pub fn confirm(at: Timestamp, attestation: BlockAttestation) -> Self {
        Self {
            expected: DocumentStatus::Stamping,
            next: DocumentStatus::Confirmed,
            at,
            event: LifecycleEvent::TimestampConfirmed,
            attestation: Some(attestation),
        }
    }

    /// Apply to `doc` if its status matches `expected`.
    ///
    /// Returns `false`, leaving `doc` untouched, when the status differs.
    /// Every backend performs its conditional write through this.
    pub fn apply(&self, doc: &mut Document) -> bool {
        if doc.status != self.expected {
            return false;
        }
        doc.status = self.next;
        let stored = doc.append_entry(LifecycleEntry::new(self.event, self.at));
        if self.next.is_terminal() {
            doc.timeline.confirmed_at = Some(stored.timestamp);
        }
        if let Some(attestation) = &self.attestation {
            doc.attestation = Some(attestation.clone());
        }
        true
    }
}

/// Persistent document records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a document, `None` when the code is unknown.
    async fn get(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError>;

    /// Insert a new document. An existing code is a `Conflict`.
    async fn put(&self, doc: &Document) -> Result<(), StoreError>;

    /// Apply `transition` if the stored status equals `transition.expected`.
    ///
    /// Returns whether this call performed the transition.
    async fn compare_and_set_status(
        &self,
        code: &DocumentCode,
        transition: &StatusTransition,
    ) -> Result<bool, StoreError>;

    /// Append `entry` to the lifecycle and return it as stored (its
    /// timestamp may be clamped to keep the log non-decreasing).
    async fn append_lifecycle_event(
        &self,
        code: &DocumentCode,
        entry: LifecycleEntry,
    ) -> Result<LifecycleEntry, StoreError>;

    /// Advance `last_verification_at` to `at` without appending an event.
    async fn touch_verification(&self, code: &DocumentCode, at: Timestamp) -> Result<(), StoreError>;

    /// All documents with `status`, ordered by upload time then code.
    async fn scan_by_status(&self, status: DocumentStatus) -> Result<Vec<Document>, StoreError>;
}

/// Ordering used by every `scan_by_status` implementation.
pub(crate) fn scan_order(a: &Document, b: &Document) -> std::cmp::Ordering {
    a.timeline
        .uploaded_at
        .cmp(&b.timeline.uploaded_at)
        .then_with(|| a.code.cmp(&b.code))
}

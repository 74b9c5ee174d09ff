//! # Lifecycle State Machine
//!
//! ```text
//!   STAMPING ──Confirmed──▶ CONFIRMED (terminal)
//!      │ ▲
//!      └─┘ Pending: append VERIFICATION_PENDING / VERIFICATION_CHECK
//! ```
//!
//! Applying a resolver [`Outcome`] is planned as a [`Step`] against the
//! document as last read, then executed against the record store:
//!
//! | Stored status | Outcome | Step |
//! |---------------|---------|------|
//! | STAMPING  | Confirmed | compare-and-set to CONFIRMED + TIMESTAMP_CONFIRMED |
//! | CONFIRMED | Confirmed | advance `lastVerificationAt` only |
//! | any       | Pending   | append the trigger's pending event |
//!
//! The confirmation is a compare-and-set keyed on the STAMPING pre-state.
//! A caller that loses the race falls back to advancing
//! `lastVerificationAt`, so every invocation advances it and exactly one
//! TIMESTAMP_CONFIRMED is ever written.

use std::sync::Arc;

use notary_attest::Outcome;
use notary_core::{Document, DocumentStatus, LifecycleEntry, LifecycleEvent, Timestamp};
use notary_store::{RecordStore, StatusTransition};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// What caused a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// A periodic reconciliation pass.
    Reconciliation,
    /// An on-demand validation request.
    OnDemand,
}

impl Trigger {
    /// Event recorded when this trigger observes a pending proof.
    pub fn pending_event(&self) -> LifecycleEvent {
        match self {
            Self::Reconciliation => LifecycleEvent::VerificationPending,
            Self::OnDemand => LifecycleEvent::VerificationCheck,
        }
    }
}

/// A single planned mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// STAMPING → CONFIRMED.
    Confirm(StatusTransition),
    /// Record a not-yet-confirmed observation.
    Append(LifecycleEntry),
    /// Re-confirmation of a confirmed document.
    Touch(Timestamp),
}

impl Step {
    /// Plan the mutation for applying `outcome` to `doc` at `at`.
    pub fn plan(doc: &Document, outcome: &Outcome, trigger: Trigger, at: Timestamp) -> Self {
        match outcome {
            Outcome::Confirmed(attestation) if doc.status == DocumentStatus::Stamping => {
                Self::Confirm(StatusTransition::confirm(at, attestation.clone()))
            }
            Outcome::Confirmed(_) => Self::Touch(at),
            Outcome::Pending(_) => Self::Append(LifecycleEntry::new(trigger.pending_event(), at)),
        }
    }

    /// Apply to an in-memory document with the record store's semantics.
    pub fn apply_to(&self, doc: &mut Document) {
        match self {
            Self::Confirm(transition) => {
                if !transition.apply(doc) {
                    doc.timeline.observe_verification(transition.at);
                }
            }
            Self::Append(entry) => {
                doc.append_entry(*entry);
            }
            Self::Touch(at) => doc.timeline.observe_verification(*at),
        }
    }
}

/// Result of applying an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The document as stored after the step.
    pub document: Document,
    /// Whether this call performed the STAMPING → CONFIRMED transition.
    pub transitioned: bool,
}

/// Applies resolver outcomes to persisted documents.
#[derive(Clone)]
pub struct LifecycleStateMachine {
    records: Arc<dyn RecordStore>,
}

impl LifecycleStateMachine {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Apply `outcome` to `doc`, observed by `trigger`, at the current time.
    pub async fn apply_outcome(
        &self,
        doc: &Document,
        outcome: &Outcome,
        trigger: Trigger,
    ) -> Result<Applied, EngineError> {
        self.apply_outcome_at(doc, outcome, trigger, Timestamp::now()).await
    }

    /// Apply `outcome` to `doc` at an explicit time.
    pub async fn apply_outcome_at(
        &self,
        doc: &Document,
        outcome: &Outcome,
        trigger: Trigger,
        at: Timestamp,
    ) -> Result<Applied, EngineError> {
        let code = &doc.code;
        let mut transitioned = false;

        match Step::plan(doc, outcome, trigger, at) {
            Step::Confirm(transition) => {
                transitioned = self.records.compare_and_set_status(code, &transition).await?;
                if transitioned {
                    tracing::info!(
                        code = %code,
                        height = transition.attestation.as_ref().map(|a| a.block_height),
                        "document confirmed"
                    );
                } else {
                    tracing::debug!(code = %code, "confirmation already recorded by a concurrent caller");
                    self.records.touch_verification(code, at).await?;
                }
            }
            Step::Touch(at) => {
                self.records.touch_verification(code, at).await?;
            }
            Step::Append(entry) => {
                let stored = self.records.append_lifecycle_event(code, entry).await?;
                match outcome.pending_reason() {
                    Some(reason) if reason.is_integrity_concern() => tracing::warn!(
                        code = %code,
                        reason = %reason,
                        event = %stored.event,
                        "proof failed an integrity check"
                    ),
                    reason => tracing::debug!(
                        code = %code,
                        reason = ?reason,
                        event = %stored.event,
                        "document still stamping"
                    ),
                }
            }
        }

        let document = self
            .records
            .get(code)
            .await?
            .ok_or_else(|| EngineError::NotFound(code.clone()))?;
        Ok(Applied {
            document,
            transitioned,
        })
    }
}

impl std::fmt::Debug for LifecycleStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleStateMachine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_attest::PendingReason;
    use notary_core::{sha256_digest, BlobRef, BlockAttestation, DocumentCode};
    use notary_store::MemoryRecordStore;
    use proptest::prelude::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(1_768_478_400 + secs).unwrap()
    }

    fn doc() -> Document {
        let digest = sha256_digest(b"hello");
        let code = DocumentCode::generate(&digest);
        Document::new_stamping(
            code.clone(),
            digest,
            BlobRef::content(&code, "document.bin").unwrap(),
            BlobRef::proof(&code),
            ts(0),
        )
    }

    fn confirmed() -> Outcome {
        Outcome::Confirmed(BlockAttestation {
            digest: sha256_digest(b"hello"),
            block_height: 800_000,
            block_time: ts(600),
            merkle_root: sha256_digest(b"root"),
        })
    }

    async fn stored(records: &Arc<MemoryRecordStore>) -> (LifecycleStateMachine, Document) {
        let d = doc();
        records.put(&d).await.unwrap();
        (LifecycleStateMachine::new(records.clone()), d)
    }

    #[test]
    fn trigger_events() {
        assert_eq!(Trigger::Reconciliation.pending_event(), LifecycleEvent::VerificationPending);
        assert_eq!(Trigger::OnDemand.pending_event(), LifecycleEvent::VerificationCheck);
    }

    #[tokio::test]
    async fn pending_on_demand_appends_check() {
        let records = Arc::new(MemoryRecordStore::new());
        let (machine, d) = stored(&records).await;
        let applied = machine
            .apply_outcome_at(&d, &Outcome::Pending(PendingReason::NotMatured), Trigger::OnDemand, ts(5))
            .await
            .unwrap();
        assert!(!applied.transitioned);
        assert_eq!(applied.document.status, DocumentStatus::Stamping);
        assert_eq!(
            applied.document.lifecycle,
            vec![LifecycleEntry::new(LifecycleEvent::VerificationCheck, ts(5))]
        );
        assert_eq!(applied.document.timeline.last_verification_at, ts(5));
    }

    #[tokio::test]
    async fn confirmation_then_reconfirmation() {
        let records = Arc::new(MemoryRecordStore::new());
        let (machine, d) = stored(&records).await;

        let first = machine
            .apply_outcome_at(&d, &confirmed(), Trigger::Reconciliation, ts(10))
            .await
            .unwrap();
        assert!(first.transitioned);
        assert_eq!(first.document.status, DocumentStatus::Confirmed);
        assert_eq!(first.document.timeline.confirmed_at, Some(ts(10)));

        let second = machine
            .apply_outcome_at(&first.document, &confirmed(), Trigger::OnDemand, ts(20))
            .await
            .unwrap();
        assert!(!second.transitioned);
        assert_eq!(second.document.confirmation_count(), 1);
        assert_eq!(second.document.lifecycle.len(), 1);
        assert_eq!(second.document.timeline.confirmed_at, Some(ts(10)));
        assert_eq!(second.document.timeline.last_verification_at, ts(20));
    }

    #[tokio::test]
    async fn stale_snapshot_loses_race_but_advances_verification() {
        let records = Arc::new(MemoryRecordStore::new());
        let (machine, d) = stored(&records).await;
        machine
            .apply_outcome_at(&d, &confirmed(), Trigger::Reconciliation, ts(10))
            .await
            .unwrap();

        // `d` still says STAMPING.
        let late = machine
            .apply_outcome_at(&d, &confirmed(), Trigger::OnDemand, ts(30))
            .await
            .unwrap();
        assert!(!late.transitioned);
        assert_eq!(late.document.confirmation_count(), 1);
        assert_eq!(late.document.timeline.last_verification_at, ts(30));
    }

    #[tokio::test]
    async fn concurrent_confirmations_transition_once() {
        let records = Arc::new(MemoryRecordStore::new());
        let (machine, d) = stored(&records).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let machine = machine.clone();
            let d = d.clone();
            let trigger = if i % 2 == 0 { Trigger::Reconciliation } else { Trigger::OnDemand };
            tasks.push(tokio::spawn(async move {
                machine.apply_outcome(&d, &confirmed(), trigger).await.unwrap().transitioned
            }));
        }
        let mut wins = 0;
        for t in tasks {
            if t.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);

        let stored = records.get(&d.code).await.unwrap().unwrap();
        assert_eq!(stored.confirmation_count(), 1);
        assert_eq!(stored.lifecycle.len(), 1);
        stored.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let records = Arc::new(MemoryRecordStore::new());
        let machine = LifecycleStateMachine::new(records.clone());
        let err = machine
            .apply_outcome(&doc(), &Outcome::Pending(PendingReason::Timeout), Trigger::OnDemand)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(records.writes(), 0);
    }

    // -- Invariants over arbitrary outcome sequences -----------------------

    fn arb_outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(confirmed()),
            Just(Outcome::Pending(PendingReason::NotMatured)),
            Just(Outcome::Pending(PendingReason::Unavailable)),
            Just(Outcome::Pending(PendingReason::Timeout)),
            Just(Outcome::Pending(PendingReason::MalformedProof)),
        ]
    }

    fn arb_trigger() -> impl Strategy<Value = Trigger> {
        prop_oneof![Just(Trigger::Reconciliation), Just(Trigger::OnDemand)]
    }

    proptest! {
        #[test]
        fn lifecycle_invariants_hold(
            steps in proptest::collection::vec((arb_outcome(), arb_trigger(), -50i64..500), 0..40)
        ) {
            let mut d = doc();
            for (outcome, trigger, offset) in steps {
                let before = d.clone();
                // Clocks may step backwards between observations.
                Step::plan(&d, &outcome, trigger, ts(offset.max(0))).apply_to(&mut d);

                prop_assert!(d.lifecycle.len() >= before.lifecycle.len());
                prop_assert_eq!(&d.lifecycle[..before.lifecycle.len()], &before.lifecycle[..]);
                prop_assert!(d.timeline.last_verification_at >= before.timeline.last_verification_at);
                if before.status == DocumentStatus::Confirmed {
                    prop_assert_eq!(d.status, DocumentStatus::Confirmed);
                    prop_assert_eq!(d.timeline.confirmed_at, before.timeline.confirmed_at);
                }
                prop_assert!(d.check_invariants().is_ok(), "{:?}", d.check_invariants());
            }
        }

        #[test]
        fn confirming_twice_equals_confirming_once(
            prefix in proptest::collection::vec((arb_outcome(), arb_trigger()), 0..10),
            at in 0i64..100,
        ) {
            let mut d = doc();
            for (i, (outcome, trigger)) in prefix.into_iter().enumerate() {
                Step::plan(&d, &outcome, trigger, ts(i as i64)).apply_to(&mut d);
            }
            let t = ts(100 + at);
            Step::plan(&d, &confirmed(), Trigger::Reconciliation, t).apply_to(&mut d);
            let once = d.clone();
            Step::plan(&d, &confirmed(), Trigger::Reconciliation, t).apply_to(&mut d);

            prop_assert_eq!(&d, &once);
            prop_assert_eq!(d.confirmation_count(), 1);
            prop_assert_eq!(d.status, DocumentStatus::Confirmed);
        }
    }
}

//! # Reconciliation Scheduler
//!
//! One `run()` is one reconciliation tick: scan every STAMPING document,
//! then resolve and apply each one with at most `max_in_flight` documents
//! in flight. Documents beyond the bound wait their turn in scan order;
//! nothing is rejected.
//!
//! A failure while processing one document (blob fetch, record write)
//! becomes a `Pending` report entry carrying the error. It never aborts
//! the batch. Only the initial scan can fail the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use notary_attest::{Outcome, ProofResolver};
use notary_core::{Document, DocumentStatus, LifecycleEntry, LifecycleEvent, Timestamp};
use notary_store::{BlobStore, RecordStore, StoreError};

use crate::error::EngineError;
use crate::lifecycle::{LifecycleStateMachine, Trigger};
use crate::report::{BatchEntry, BatchReport, EntryOutcome};

/// Drives STAMPING documents toward confirmation.
#[derive(Clone)]
pub struct ReconciliationScheduler {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    resolver: ProofResolver,
    machine: LifecycleStateMachine,
    max_in_flight: usize,
}

impl ReconciliationScheduler {
    /// `max_in_flight` is clamped to at least 1.
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        resolver: ProofResolver,
        max_in_flight: usize,
    ) -> Self {
        Self {
            machine: LifecycleStateMachine::new(records.clone()),
            records,
            blobs,
            resolver,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Run one reconciliation pass.
    pub async fn run(&self) -> Result<BatchReport, EngineError> {
        let started_at = Timestamp::now();
        let docs = self.records.scan_by_status(DocumentStatus::Stamping).await?;
        tracing::info!(
            documents = docs.len(),
            max_in_flight = self.max_in_flight,
            "reconciliation started"
        );

        let entries: Vec<BatchEntry> = stream::iter(docs)
            .map(|doc| self.reconcile_one(doc))
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let report = BatchReport::from_entries(started_at, Timestamp::now(), entries);
        tracing::info!(
            examined = report.examined,
            confirmed = report.confirmed,
            pending = report.pending,
            failed = report.failed,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn reconcile_one(&self, doc: Document) -> BatchEntry {
        let (content, proof) = match self.fetch(&doc).await {
            Ok(blobs) => blobs,
            Err(e) => {
                tracing::error!(code = %doc.code, error = %e, "blob fetch failed");
                self.record_attempt(&doc).await;
                return failed_entry(&doc, e.to_string());
            }
        };

        let outcome = self.resolver.resolve(&content, &proof).await;
        match self
            .machine
            .apply_outcome(&doc, &outcome, Trigger::Reconciliation)
            .await
        {
            Ok(applied) => BatchEntry {
                code: doc.code,
                status: applied.document.status,
                outcome: match outcome {
                    Outcome::Confirmed(_) => EntryOutcome::Confirmed,
                    Outcome::Pending(_) => EntryOutcome::Pending,
                },
                pending_reason: outcome.pending_reason(),
                error: None,
            },
            Err(e) => {
                tracing::error!(code = %doc.code, error = %e, "failed to record outcome");
                BatchEntry {
                    pending_reason: outcome.pending_reason(),
                    ..failed_entry(&doc, e.to_string())
                }
            }
        }
    }

    async fn fetch(&self, doc: &Document) -> Result<(Vec<u8>, Vec<u8>), StoreError> {
        let content = self.blobs.get_content(&doc.content_ref).await?;
        let proof = self.blobs.get_proof(&doc.proof_ref).await?;
        Ok((content, proof))
    }

    /// Best-effort VERIFICATION_PENDING for a document whose blobs could
    /// not be read.
    async fn record_attempt(&self, doc: &Document) {
        let entry = LifecycleEntry::new(LifecycleEvent::VerificationPending, Timestamp::now());
        if let Err(e) = self.records.append_lifecycle_event(&doc.code, entry).await {
            tracing::warn!(code = %doc.code, error = %e, "could not record verification attempt");
        }
    }
}

fn failed_entry(doc: &Document, error: String) -> BatchEntry {
    BatchEntry {
        code: doc.code.clone(),
        status: doc.status,
        outcome: EntryOutcome::Pending,
        pending_reason: None,
        error: Some(error),
    }
}

impl std::fmt::Debug for ReconciliationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationScheduler")
            .field("resolver", &self.resolver)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

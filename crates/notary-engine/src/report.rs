//! Report types returned by the engine surfaces.
//!
//! These are observations for callers and logs; none of them carries
//! authority over persisted state.

use std::collections::BTreeMap;

use notary_attest::{Outcome, PendingReason};
use notary_core::{
    BlockAttestation, ContentDigest, Document, DocumentCode, DocumentStatus, LifecycleEntry,
    Timeline, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Human-readable estimate shown while a document is stamping.
pub const STAMPING_ESTIMATE: &str = "The stamping process usually takes between 30-60 minutes";

/// Returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub code: DocumentCode,
    pub document_hash: ContentDigest,
    pub status: DocumentStatus,
    pub timeline: Timeline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl From<&Document> for UploadReceipt {
    fn from(doc: &Document) -> Self {
        Self {
            code: doc.code.clone(),
            document_hash: doc.document_hash,
            status: doc.status,
            timeline: doc.timeline,
            filename: doc.filename.clone(),
        }
    }
}

/// Result of an on-demand validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub code: DocumentCode,
    pub status: DocumentStatus,
    /// True once the document is CONFIRMED.
    pub verified: bool,
    pub document_hash: ContentDigest,
    pub timeline: Timeline,
    pub lifecycle: Vec<LifecycleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<BlockAttestation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    /// Why this check did not confirm, if it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reason: Option<PendingReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ValidationReport {
    /// Build the report for `doc` as stored after applying `outcome`.
    pub fn new(doc: Document, outcome: &Outcome) -> Self {
        let verified = doc.status == DocumentStatus::Confirmed;
        let (message, estimated_time) = match &doc.attestation {
            Some(a) if verified => (
                format!("Document timestamp confirmed in block {}", a.block_height),
                None,
            ),
            _ if verified => ("Document timestamp confirmed".to_string(), None),
            _ => (
                "Document is being stamped".to_string(),
                Some(STAMPING_ESTIMATE.to_string()),
            ),
        };
        let explorer_url = doc
            .attestation
            .as_ref()
            .filter(|_| verified)
            .map(BlockAttestation::explorer_url);

        Self {
            code: doc.code,
            status: doc.status,
            verified,
            document_hash: doc.document_hash,
            timeline: doc.timeline,
            lifecycle: doc.lifecycle,
            attestation: doc.attestation,
            explorer_url,
            message,
            estimated_time,
            // A confirmed record outranks a later check that could not reach the calendar.
            pending_reason: outcome.pending_reason().filter(|_| !verified),
            filename: doc.filename,
            metadata: doc.metadata,
        }
    }
}

/// Per-document result of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryOutcome {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub code: DocumentCode,
    /// Status after the pass.
    pub status: DocumentStatus,
    pub outcome: EntryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reason: Option<PendingReason>,
    /// Set when processing this document failed; the outcome is then
    /// `Pending`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one reconciliation pass.
///
/// `examined == confirmed + pending`; `failed` counts the pending entries
/// that carry an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub examined: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Tally `entries`, ordered by code.
    pub fn from_entries(
        started_at: Timestamp,
        finished_at: Timestamp,
        mut entries: Vec<BatchEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        let confirmed = entries
            .iter()
            .filter(|e| e.outcome == EntryOutcome::Confirmed)
            .count();
        let failed = entries.iter().filter(|e| e.error.is_some()).count();
        Self {
            started_at,
            finished_at,
            examined: entries.len(),
            confirmed,
            pending: entries.len() - confirmed,
            failed,
            entries,
        }
    }

    /// The entry for `code`, if it was examined.
    pub fn entry(&self, code: &DocumentCode) -> Option<&BatchEntry> {
        self.entries.iter().find(|e| &e.code == code)
    }
}

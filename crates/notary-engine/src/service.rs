//! # Notary Service
//!
//! The three surfaces consumed by an outer transport layer:
//!
//! - [`NotaryService::upload`]: digest, generate the pending proof, store
//!   blobs and the STAMPING record.
//! - [`NotaryService::validate`]: resolve one document on demand.
//! - [`NotaryService::reconcile`]: one reconciliation tick.
//!
//! All collaborators are injected at construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use notary_attest::{AttestationNetwork, Outcome, ProofGenerator, ProofResolver};
use notary_core::{BlobRef, Document, DocumentCode, DocumentStatus, Timestamp};
use notary_store::{BlobStore, RecordStore, StoreError};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lifecycle::{LifecycleStateMachine, Trigger};
use crate::report::{BatchReport, UploadReceipt, ValidationReport};
use crate::scheduler::ReconciliationScheduler;

/// Filename used when the uploader supplies none.
pub const DEFAULT_FILENAME: &str = "document.bin";

/// Attempts at finding an unused document code.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Descriptive fields accompanying an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub filename: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl UploadRequest {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The notary engine with its collaborators wired in.
#[derive(Clone)]
pub struct NotaryService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    generator: ProofGenerator,
    resolver: ProofResolver,
    machine: LifecycleStateMachine,
    scheduler: ReconciliationScheduler,
}

impl NotaryService {
    pub fn new(
        network: Arc<dyn AttestationNetwork>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        config: &EngineConfig,
    ) -> Self {
        let generator = ProofGenerator::new(network.clone(), config.submit_timeout);
        let resolver = ProofResolver::new(network, config.resolve_timeout);
        Self {
            machine: LifecycleStateMachine::new(records.clone()),
            scheduler: ReconciliationScheduler::new(
                records.clone(),
                blobs.clone(),
                resolver.clone(),
                config.max_in_flight,
            ),
            records,
            blobs,
            generator,
            resolver,
        }
    }

    /// Notarize `content`.
    ///
    /// Fails without storing anything if proof generation fails.
    pub async fn upload(
        &self,
        content: &[u8],
        request: UploadRequest,
    ) -> Result<UploadReceipt, EngineError> {
        let filename = match request.filename {
            Some(name) if !BlobRef::is_valid_segment(&name) || name.trim().is_empty() => {
                return Err(EngineError::InvalidRequest(format!("unusable filename {name:?}")));
            }
            Some(name) => name,
            None => DEFAULT_FILENAME.to_string(),
        };

        let proof = self.generator.generate(content).await?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = DocumentCode::generate(&proof.digest);
            if self.records.get(&code).await?.is_some() {
                tracing::debug!(code = %code, attempt, "document code taken, regenerating");
                continue;
            }

            let content_ref = BlobRef::content(&code, &filename)?;
            let proof_ref = BlobRef::proof(&code);
            self.blobs.put_content(&content_ref, content).await?;
            self.blobs.put_proof(&proof_ref, &proof.bytes).await?;

            let mut doc =
                Document::new_stamping(code, proof.digest, content_ref, proof_ref, Timestamp::now());
            doc.filename = Some(filename.clone());
            doc.metadata = request.metadata.clone();

            match self.records.put(&doc).await {
                Ok(()) => {
                    tracing::info!(
                        code = %doc.code,
                        digest = %doc.document_hash,
                        size = content.len(),
                        "document uploaded"
                    );
                    return Ok(UploadReceipt::from(&doc));
                }
                Err(StoreError::Conflict(code)) => {
                    tracing::debug!(code = %code, attempt, "document code taken, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::CodeExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Resolve one document on demand.
    ///
    /// A still-stamping document is a successful report, not an error.
    /// An unknown code is `NotFound` and mutates nothing.
    pub async fn validate(&self, code: &DocumentCode) -> Result<ValidationReport, EngineError> {
        let doc = self
            .records
            .get(code)
            .await?
            .ok_or_else(|| EngineError::NotFound(code.clone()))?;

        let outcome = match (&doc.status, &doc.attestation) {
            (DocumentStatus::Confirmed, Some(attestation)) => Outcome::Confirmed(attestation.clone()),
            _ => {
                let content = self.blobs.get_content(&doc.content_ref).await?;
                let proof = self.blobs.get_proof(&doc.proof_ref).await?;
                self.resolver.resolve(&content, &proof).await
            }
        };

        let applied = self
            .machine
            .apply_outcome(&doc, &outcome, Trigger::OnDemand)
            .await?;
        tracing::info!(
            code = %code,
            status = %applied.document.status,
            transitioned = applied.transitioned,
            "document validated"
        );
        Ok(ValidationReport::new(applied.document, &outcome))
    }

    /// Run one reconciliation tick.
    pub async fn reconcile(&self) -> Result<BatchReport, EngineError> {
        self.scheduler.run().await
    }

    /// Documents still awaiting confirmation.
    pub async fn pending(&self) -> Result<Vec<Document>, EngineError> {
        Ok(self.records.scan_by_status(DocumentStatus::Stamping).await?)
    }
}

impl std::fmt::Debug for NotaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotaryService")
            .field("generator", &self.generator)
            .field("resolver", &self.resolver)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use notary_attest::MockCalendar;
    use notary_core::LifecycleEntry;
    use notary_store::{MemoryBlobStore, MemoryRecordStore, StatusTransition};

    /// Answers the first `conflicts` inserts with `Conflict`, as if another
    /// writer had claimed each code between the lookup and the insert.
    struct RacingRecords {
        inner: MemoryRecordStore,
        conflicts: AtomicU32,
        attempted: Mutex<Vec<DocumentCode>>,
    }

    impl RacingRecords {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: MemoryRecordStore::new(),
                conflicts: AtomicU32::new(conflicts),
                attempted: Mutex::new(Vec::new()),
            }
        }

        fn attempted(&self) -> Vec<DocumentCode> {
            self.attempted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for RacingRecords {
        async fn get(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError> {
            self.inner.get(code).await
        }

        async fn put(&self, doc: &Document) -> Result<(), StoreError> {
            self.attempted.lock().unwrap().push(doc.code.clone());
            let claimed = self
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if claimed {
                return Err(StoreError::Conflict(doc.code.clone()));
            }
            self.inner.put(doc).await
        }

        async fn compare_and_set_status(
            &self,
            code: &DocumentCode,
            transition: &StatusTransition,
        ) -> Result<bool, StoreError> {
            self.inner.compare_and_set_status(code, transition).await
        }

        async fn append_lifecycle_event(
            &self,
            code: &DocumentCode,
            entry: LifecycleEntry,
        ) -> Result<LifecycleEntry, StoreError> {
            self.inner.append_lifecycle_event(code, entry).await
        }

        async fn touch_verification(&self, code: &DocumentCode, at: Timestamp) -> Result<(), StoreError> {
            self.inner.touch_verification(code, at).await
        }

        async fn scan_by_status(&self, status: DocumentStatus) -> Result<Vec<Document>, StoreError> {
            self.inner.scan_by_status(status).await
        }
    }

    fn racing_service(conflicts: u32) -> (NotaryService, Arc<MockCalendar>, Arc<RacingRecords>) {
        let cal = Arc::new(MockCalendar::new("mock"));
        let records = Arc::new(RacingRecords::new(conflicts));
        let svc = NotaryService::new(
            cal.clone(),
            records.clone(),
            Arc::new(MemoryBlobStore::new()),
            &EngineConfig::default(),
        );
        (svc, cal, records)
    }

    fn service() -> (NotaryService, Arc<MockCalendar>, Arc<MemoryRecordStore>, Arc<MemoryBlobStore>) {
        let cal = Arc::new(MockCalendar::new("mock"));
        let records = Arc::new(MemoryRecordStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let svc = NotaryService::new(cal.clone(), records.clone(), blobs.clone(), &EngineConfig::default());
        (svc, cal, records, blobs)
    }

    #[tokio::test]
    async fn upload_stores_blobs_and_record() {
        let (svc, _cal, records, blobs) = service();
        let receipt = svc
            .upload(
                b"contract",
                UploadRequest::default()
                    .with_filename("contract.pdf")
                    .with_metadata("issuer", "Acme"),
            )
            .await
            .unwrap();

        assert_eq!(receipt.status, DocumentStatus::Stamping);
        assert_eq!(receipt.code.digest_prefix(), &receipt.document_hash.to_hex()[..8].to_uppercase());
        let doc = records.get(&receipt.code).await.unwrap().unwrap();
        assert_eq!(doc.content_ref.as_str(), format!("{}/contract.pdf", receipt.code));
        assert_eq!(doc.proof_ref.as_str(), format!("{}.proof", receipt.code));
        assert_eq!(doc.metadata.get("issuer").map(String::as_str), Some("Acme"));
        assert_eq!(blobs.get_content(&doc.content_ref).await.unwrap(), b"contract");
        assert!(doc.lifecycle.is_empty());
    }

    #[tokio::test]
    async fn upload_without_filename_uses_default() {
        let (svc, _cal, records, _blobs) = service();
        let receipt = svc.upload(b"x", UploadRequest::default()).await.unwrap();
        let doc = records.get(&receipt.code).await.unwrap().unwrap();
        assert!(doc.content_ref.as_str().ends_with("/document.bin"));
    }

    #[tokio::test]
    async fn unusable_filename_is_rejected_before_submission() {
        let (svc, cal, records, _blobs) = service();
        for bad in ["../escape", "a/b", "  ", ".", "..", "", "a\\b"] {
            let err = svc
                .upload(b"x", UploadRequest::default().with_filename(bad))
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidRequest(_)), "{bad}: {err:?}");
        }
        assert_eq!(cal.submissions(), 0);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn lost_code_race_regenerates_code() {
        let (svc, cal, records) = racing_service(2);
        let receipt = svc.upload(b"contract", UploadRequest::default()).await.unwrap();

        let attempted = records.attempted();
        assert_eq!(attempted.len(), 3);
        assert_ne!(attempted[0], attempted[1]);
        assert_ne!(attempted[1], attempted[2]);
        assert_eq!(attempted[2], receipt.code);
        assert!(attempted.iter().all(|c| c.digest_prefix() == receipt.code.digest_prefix()));
        assert!(records.get(&receipt.code).await.unwrap().is_some());
        assert_eq!(cal.submissions(), 1);
    }

    #[tokio::test]
    async fn persistent_code_conflicts_exhaust_attempts() {
        let (svc, cal, records) = racing_service(u32::MAX);
        let err = svc.upload(b"contract", UploadRequest::default()).await.unwrap_err();

        assert!(
            matches!(err, EngineError::CodeExhausted { attempts } if attempts == MAX_CODE_ATTEMPTS),
            "{err:?}"
        );
        assert_eq!(records.attempted().len(), MAX_CODE_ATTEMPTS as usize);
        assert!(records.scan_by_status(DocumentStatus::Stamping).await.unwrap().is_empty());
        assert_eq!(cal.submissions(), 1);
    }

    #[tokio::test]
    async fn blob_write_failure_surfaces_as_storage() {
        let (svc, _cal, records, blobs) = service();
        blobs.set_fail_writes(true);
        let err = svc.upload(b"x", UploadRequest::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn validate_blob_failure_surfaces_as_storage() {
        let (svc, _cal, records, blobs) = service();
        let receipt = svc.upload(b"x", UploadRequest::default()).await.unwrap();
        blobs.set_fail_reads(true);
        let writes = records.writes();
        let err = svc.validate(&receipt.code).await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(records.writes(), writes);
    }

    #[tokio::test]
    async fn pending_lists_stamping_documents() {
        let (svc, cal, _records, _blobs) = service();
        let a = svc.upload(b"a", UploadRequest::default()).await.unwrap();
        cal.mine_block(1, Timestamp::now());
        svc.validate(&a.code).await.unwrap();
        let b = svc.upload(b"b", UploadRequest::default()).await.unwrap();

        let pending = svc.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].code, b.code);
    }
}

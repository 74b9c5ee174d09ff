//! Behavior every [`RecordStore`] backend must share, run against each
//! backend from its own test module.

use std::sync::Arc;

use notary_core::{
    sha256_digest, BlobRef, BlockAttestation, Document, DocumentCode, DocumentStatus,
    LifecycleEntry, LifecycleEvent, Timestamp,
};

use crate::error::StoreError;
use crate::record::{RecordStore, StatusTransition};

pub(crate) fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

pub(crate) fn sample_doc(code: &str, uploaded_at: &str) -> Document {
    let code = DocumentCode::parse(code).unwrap();
    let mut doc = Document::new_stamping(
        code.clone(),
        sha256_digest(code.as_str().as_bytes()),
        BlobRef::content(&code, "document.bin").unwrap(),
        BlobRef::proof(&code),
        ts(uploaded_at),
    );
    doc.filename = Some("document.bin".into());
    doc.metadata.insert("issuer".into(), "Acme Notaries".into());
    doc
}

fn attestation(doc: &Document) -> BlockAttestation {
    BlockAttestation {
        digest: doc.document_hash,
        block_height: 800_000,
        block_time: ts("2026-01-15T12:40:00.000Z"),
        merkle_root: sha256_digest(b"root"),
    }
}

pub(crate) async fn run_all<S: RecordStore>(store: &S) {
    put_get_roundtrip(store).await;
    duplicate_put_conflicts(store).await;
    missing_code(store).await;
    append_and_touch(store).await;
    compare_and_set(store).await;
    scan_filters_and_orders(store).await;
}

async fn put_get_roundtrip<S: RecordStore>(store: &S) {
    let doc = sample_doc("AAAAAAAA-00000001", "2026-01-15T12:00:00.000Z");
    store.put(&doc).await.unwrap();
    assert_eq!(store.get(&doc.code).await.unwrap(), Some(doc));
}

async fn duplicate_put_conflicts<S: RecordStore>(store: &S) {
    let doc = sample_doc("AAAAAAAA-00000002", "2026-01-15T12:00:00.000Z");
    store.put(&doc).await.unwrap();
    let mut other = doc.clone();
    other.filename = Some("other.pdf".into());
    let err = store.put(&other).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    assert_eq!(store.get(&doc.code).await.unwrap(), Some(doc));
}

async fn missing_code<S: RecordStore>(store: &S) {
    let code = DocumentCode::parse("FFFFFFFF-FFFFFFFF").unwrap();
    assert_eq!(store.get(&code).await.unwrap(), None);
    let err = store
        .append_lifecycle_event(
            &code,
            LifecycleEntry::new(LifecycleEvent::VerificationCheck, Timestamp::now()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

async fn append_and_touch<S: RecordStore>(store: &S) {
    let doc = sample_doc("AAAAAAAA-00000003", "2026-01-15T12:00:00.000Z");
    store.put(&doc).await.unwrap();

    let first = store
        .append_lifecycle_event(
            &doc.code,
            LifecycleEntry::new(LifecycleEvent::VerificationCheck, ts("2026-01-15T12:05:00.000Z")),
        )
        .await
        .unwrap();
    // An earlier clock reading is clamped to keep the log ordered.
    let second = store
        .append_lifecycle_event(
            &doc.code,
            LifecycleEntry::new(LifecycleEvent::VerificationPending, ts("2026-01-15T12:01:00.000Z")),
        )
        .await
        .unwrap();
    assert_eq!(second.timestamp, first.timestamp);

    store
        .touch_verification(&doc.code, ts("2026-01-15T12:02:00.000Z"))
        .await
        .unwrap();
    let stored = store.get(&doc.code).await.unwrap().unwrap();
    assert_eq!(stored.lifecycle.len(), 2);
    assert_eq!(stored.timeline.last_verification_at, ts("2026-01-15T12:05:00.000Z"));

    store
        .touch_verification(&doc.code, ts("2026-01-15T12:09:00.000Z"))
        .await
        .unwrap();
    let stored = store.get(&doc.code).await.unwrap().unwrap();
    assert_eq!(stored.timeline.last_verification_at, ts("2026-01-15T12:09:00.000Z"));
    stored.check_invariants().unwrap();
}

async fn compare_and_set<S: RecordStore>(store: &S) {
    let doc = sample_doc("AAAAAAAA-00000004", "2026-01-15T12:00:00.000Z");
    store.put(&doc).await.unwrap();
    let at = ts("2026-01-15T13:00:00.000Z");
    let transition = StatusTransition::confirm(at, attestation(&doc));

    assert!(store.compare_and_set_status(&doc.code, &transition).await.unwrap());
    assert!(!store.compare_and_set_status(&doc.code, &transition).await.unwrap());

    let stored = store.get(&doc.code).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Confirmed);
    assert_eq!(stored.timeline.confirmed_at, Some(at));
    assert_eq!(stored.confirmation_count(), 1);
    assert_eq!(stored.attestation, Some(attestation(&doc)));
    stored.check_invariants().unwrap();
}

async fn scan_filters_and_orders<S: RecordStore>(store: &S) {
    let late = sample_doc("BBBBBBBB-00000002", "2026-01-16T09:00:00.000Z");
    let early = sample_doc("BBBBBBBB-00000001", "2026-01-14T09:00:00.000Z");
    store.put(&late).await.unwrap();
    store.put(&early).await.unwrap();

    let stamping = store.scan_by_status(DocumentStatus::Stamping).await.unwrap();
    let codes: Vec<&str> = stamping.iter().map(|d| d.code.as_str()).collect();
    assert!(stamping.iter().all(|d| d.status == DocumentStatus::Stamping));
    assert!(!codes.contains(&"AAAAAAAA-00000004"));
    let early_at = codes.iter().position(|c| *c == "BBBBBBBB-00000001").unwrap();
    let late_at = codes.iter().position(|c| *c == "BBBBBBBB-00000002").unwrap();
    assert!(early_at < late_at);

    let confirmed = store.scan_by_status(DocumentStatus::Confirmed).await.unwrap();
    assert!(confirmed.iter().any(|d| d.code.as_str() == "AAAAAAAA-00000004"));
}

/// Many concurrent confirmations and appends against one document: exactly
/// one transition wins and no append is lost.
pub(crate) async fn concurrent_confirmations<S: RecordStore + 'static>(store: Arc<S>) {
    let doc = sample_doc("CCCCCCCC-00000001", "2026-01-15T12:00:00.000Z");
    store.put(&doc).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        let code = doc.code.clone();
        let attestation = attestation(&doc);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let t = StatusTransition::confirm(Timestamp::now(), attestation);
                store.compare_and_set_status(&code, &t).await.unwrap()
            } else {
                store
                    .append_lifecycle_event(
                        &code,
                        LifecycleEntry::new(LifecycleEvent::VerificationPending, Timestamp::now()),
                    )
                    .await
                    .unwrap();
                false
            }
        }));
    }
    let won = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(won, 1);

    let stored = store.get(&doc.code).await.unwrap().unwrap();
    assert_eq!(stored.confirmation_count(), 1);
    assert_eq!(stored.lifecycle.len(), 9);
    stored.check_invariants().unwrap();
}

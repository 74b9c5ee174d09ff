//! In-memory record store.
//!
//! Each mutation runs under the map's per-entry write lock, so a
//! compare-and-set and a concurrent append on the same code are
//! linearized without any global lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use notary_core::{Document, DocumentCode, DocumentStatus, LifecycleEntry, Timestamp};

use crate::error::StoreError;
use crate::record::{scan_order, RecordStore, StatusTransition};

/// In-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    docs: DashMap<DocumentCode, Document>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutations, including no-op compare-and-sets
    /// that reached a stored record.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every mutation fail with `Unavailable` while set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn check_writable(&self, code: &DocumentCode) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {code}")));
        }
        Ok(())
    }

    fn mutate<T>(
        &self,
        code: &DocumentCode,
        f: impl FnOnce(&mut Document) -> T,
    ) -> Result<T, StoreError> {
        self.check_writable(code)?;
        let mut doc = self
            .docs
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.clone()))?;
        let out = f(doc.value_mut());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.get(code).map(|d| d.value().clone()))
    }

    async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        self.check_writable(&doc.code)?;
        match self.docs.entry(doc.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(doc.code.clone())),
            Entry::Vacant(slot) => {
                slot.insert(doc.clone());
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn compare_and_set_status(
        &self,
        code: &DocumentCode,
        transition: &StatusTransition,
    ) -> Result<bool, StoreError> {
        self.mutate(code, |doc| transition.apply(doc))
    }

    async fn append_lifecycle_event(
        &self,
        code: &DocumentCode,
        entry: LifecycleEntry,
    ) -> Result<LifecycleEntry, StoreError> {
        self.mutate(code, |doc| doc.append_entry(entry))
    }

    async fn touch_verification(&self, code: &DocumentCode, at: Timestamp) -> Result<(), StoreError> {
        self.mutate(code, |doc| doc.timeline.observe_verification(at))
    }

    async fn scan_by_status(&self, status: DocumentStatus) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = self
            .docs
            .iter()
            .filter(|d| d.status == status)
            .map(|d| d.value().clone())
            .collect();
        docs.sort_by(scan_order);
        Ok(docs)
    }
}

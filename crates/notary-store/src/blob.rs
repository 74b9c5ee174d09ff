//! # Blob Store
//!
//! Opaque byte storage for document content and serialized proofs,
//! addressed by [`BlobRef`]. The notary never interprets the addressing
//! scheme beyond the conventions in [`BlobRef::content`] and
//! [`BlobRef::proof`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use notary_core::BlobRef;
use tokio::fs;

use crate::error::StoreError;

/// Byte storage keyed by [`BlobRef`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `blob`, replacing any previous value.
    async fn put(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), StoreError>;

    /// Fetch the bytes under `blob`. Missing blobs are `BlobNotFound`.
    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, StoreError>;

    async fn put_content(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), StoreError> {
        self.put(blob, bytes).await
    }

    async fn get_content(&self, blob: &BlobRef) -> Result<Vec<u8>, StoreError> {
        self.get(blob).await
    }

    async fn put_proof(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), StoreError> {
        self.put(blob, bytes).await
    }

    async fn get_proof(&self, blob: &BlobRef) -> Result<Vec<u8>, StoreError> {
        self.get(blob).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// In-memory blob store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobRef, Vec<u8>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` fail with `Unavailable` while set.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `put` fail with `Unavailable` while set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Remove a blob, simulating loss in the backing store.
    pub fn remove(&self, blob: &BlobRef) -> Option<Vec<u8>> {
        self.blobs.remove(blob).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {blob}")));
        }
        self.blobs.insert(blob.clone(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of {blob}")));
        }
        self.blobs
            .get(blob)
            .map(|v| v.value().clone())
            .ok_or_else(|| StoreError::BlobNotFound(blob.clone()))
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Filesystem blob store.
///
/// Blobs are stored at `{base_dir}/{blob_ref}`. Writes go to a uniquely
/// named temporary sibling first and are renamed into place, so readers
/// never observe a partially written blob, even with several processes
/// writing.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `base_dir`. The directory is created on
    /// first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Return the base directory path.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_of(&self, blob: &BlobRef) -> PathBuf {
        blob.as_str()
            .split('/')
            .fold(self.base_dir.clone(), |p, seg| p.join(seg))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(blob);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp-{}-{seq}", std::process::id()));
        let written = match fs::write(&tmp, bytes).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(blob = %blob, len = bytes.len(), "stored blob");
        Ok(())
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.path_of(blob)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound(blob.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

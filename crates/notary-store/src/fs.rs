//! # Filesystem Record Store
//!
//! One JSON file per document at `{base_dir}/{code}.json`. Every `notary`
//! process pointed at the same data directory shares these files.
//!
//! - Writes are staged in a uniquely named temporary file. An update is
//!   renamed into place; an insert is hard-linked, which fails atomically
//!   when the code is taken. Readers only ever see whole records.
//! - An update holds `{code}.lock` for its whole read-modify-write. The
//!   lock file is created with `create_new`, so it excludes writers in
//!   other processes as well as other tasks in this one.
//! - A lock older than the stale threshold belongs to a writer that died
//!   mid-update and is broken.
//!
//! All I/O goes through `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use notary_core::{Document, DocumentCode, DocumentStatus, LifecycleEntry, Timestamp};
use tokio::fs;

use crate::error::StoreError;
use crate::record::{scan_order, RecordStore, StatusTransition};

/// How long an update waits for a record lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Age after which a record lock is considered abandoned.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

const LOCK_BACKOFF_MIN: Duration = Duration::from_millis(1);
const LOCK_BACKOFF_MAX: Duration = Duration::from_millis(50);

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    base_dir: PathBuf,
    lock_timeout: Duration,
    stale_after: Duration,
}

/// Exclusive hold on one record, released by deleting the lock file.
struct RecordLock {
    path: PathBuf,
}

impl RecordLock {
    async fn release(self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release record lock");
        }
    }
}

impl FsRecordStore {
    /// Open (creating if needed) a store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            lock_timeout: LOCK_TIMEOUT,
            stale_after: LOCK_STALE_AFTER,
        })
    }

    /// Override how long an update waits for a record lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Override the age after which a record lock is broken.
    pub fn with_stale_lock_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    /// Return the base directory path.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_of(&self, code: &DocumentCode) -> PathBuf {
        self.base_dir.join(format!("{code}.json"))
    }

    fn lock_path(&self, code: &DocumentCode) -> PathBuf {
        self.base_dir.join(format!("{code}.lock"))
    }

    async fn read(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError> {
        let bytes = match fs::read(self.path_of(code)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Write `doc` to a fresh temporary file and return its path.
    async fn stage(&self, doc: &Document) -> Result<PathBuf, StoreError> {
        let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .base_dir
            .join(format!(".{}.{}.{seq}.tmp", doc.code, std::process::id()));
        let bytes = serde_json::to_vec_pretty(doc)?;
        if let Err(e) = fs::write(&tmp, bytes).await {
            discard(&tmp).await;
            return Err(e.into());
        }
        Ok(tmp)
    }

    async fn lock(&self, code: &DocumentCode) -> Result<RecordLock, StoreError> {
        let path = self.lock_path(code);
        let started = tokio::time::Instant::now();
        let mut backoff = LOCK_BACKOFF_MIN;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(RecordLock { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
            if started.elapsed() >= self.lock_timeout {
                return Err(StoreError::Contended {
                    code: code.clone(),
                    attempts,
                });
            }
            if self.break_if_stale(&path).await? {
                continue;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(LOCK_BACKOFF_MAX);
        }
    }

    /// Remove the lock at `path` if it is abandoned. Returns true when the
    /// lock is gone and acquisition should be retried at once.
    async fn break_if_stale(&self, path: &Path) -> Result<bool, StoreError> {
        let modified = match fs::metadata(path).await {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age < self.stale_after {
            return Ok(false);
        }
        tracing::warn!(lock = %path.display(), age_ms = age.as_millis() as u64, "breaking stale record lock");
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn mutate<T: Send>(
        &self,
        code: &DocumentCode,
        f: impl FnOnce(&mut Document) -> T + Send,
    ) -> Result<T, StoreError> {
        let lock = self.lock(code).await?;
        let result = self.mutate_locked(code, f).await;
        lock.release().await;
        result
    }

    async fn mutate_locked<T: Send>(
        &self,
        code: &DocumentCode,
        f: impl FnOnce(&mut Document) -> T + Send,
    ) -> Result<T, StoreError> {
        let mut doc = self
            .read(code)
            .await?
            .ok_or_else(|| StoreError::NotFound(code.clone()))?;
        let before = doc.clone();
        let out = f(&mut doc);
        if doc != before {
            let tmp = self.stage(&doc).await?;
            if let Err(e) = fs::rename(&tmp, self.path_of(code)).await {
                discard(&tmp).await;
                return Err(e.into());
            }
        }
        Ok(out)
    }
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %tmp.display(), error = %e, "failed to remove staged record");
        }
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn get(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError> {
        self.read(code).await
    }

    async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        let tmp = self.stage(doc).await?;
        let linked = fs::hard_link(&tmp, self.path_of(&doc.code)).await;
        discard(&tmp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::Conflict(doc.code.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn compare_and_set_status(
        &self,
        code: &DocumentCode,
        transition: &StatusTransition,
    ) -> Result<bool, StoreError> {
        self.mutate(code, |doc| transition.apply(doc)).await
    }

    async fn append_lifecycle_event(
        &self,
        code: &DocumentCode,
        entry: LifecycleEntry,
    ) -> Result<LifecycleEntry, StoreError> {
        self.mutate(code, |doc| doc.append_entry(entry)).await
    }

    async fn touch_verification(&self, code: &DocumentCode, at: Timestamp) -> Result<(), StoreError> {
        self.mutate(code, |doc| doc.timeline.observe_verification(at))
            .await
    }

    async fn scan_by_status(&self, status: DocumentStatus) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        let mut entries = fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Document>(&bytes) {
                Ok(doc) if doc.status == status => docs.push(doc),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                }
            }
        }
        docs.sort_by(scan_order);
        Ok(docs)
    }
}

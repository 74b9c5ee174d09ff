//! # PostgreSQL Record Store
//!
//! Documents live in the `documents` table (see `migrations/`), one row
//! per code with the full record as JSONB. Mutations are optimistic: read
//! the row and its `version`, apply the change in memory, then
//! `UPDATE ... WHERE code = $1 AND status = $2 AND version = $3`. A lost
//! race re-reads and re-applies, so a compare-and-set whose expected
//! status no longer holds returns `false` on the retry instead of
//! overwriting the winner.

use std::time::Duration;

use async_trait::async_trait;
use notary_core::{Document, DocumentCode, DocumentStatus, LifecycleEntry, Timestamp};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StoreError;
use crate::record::{RecordStore, StatusTransition};

/// Optimistic update attempts before giving up with `Contended`.
const MAX_ATTEMPTS: u32 = 16;

/// Connect to `url` and apply the embedded migrations.
pub async fn connect(url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// PostgreSQL-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn mutate<T: Send>(
        &self,
        code: &DocumentCode,
        mut f: impl FnMut(&mut Document) -> T + Send,
    ) -> Result<T, StoreError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let row = sqlx::query_as::<_, DocumentRow>(
                "SELECT record, version FROM documents WHERE code = $1",
            )
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(code.clone()))?;

            let version = row.version;
            let mut doc = row.into_document()?;
            let expected_status = doc.status;
            let before = doc.clone();
            let out = f(&mut doc);
            if doc == before {
                return Ok(out);
            }

            let record = serde_json::to_value(&doc)?;
            let result = sqlx::query(
                "UPDATE documents SET status = $1, record = $2, version = version + 1
                 WHERE code = $3 AND status = $4 AND version = $5",
            )
            .bind(doc.status.as_str())
            .bind(&record)
            .bind(code.as_str())
            .bind(expected_status.as_str())
            .bind(version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(out);
            }
            tracing::debug!(code = %code, attempt, "concurrent write, retrying update");
        }
        Err(StoreError::Contended {
            code: code.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, code: &DocumentCode) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT record, version FROM documents WHERE code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::into_document).transpose()
    }

    async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        let record = serde_json::to_value(doc)?;
        let result = sqlx::query(
            "INSERT INTO documents (code, document_hash, status, uploaded_at, record)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(doc.code.as_str())
        .bind(doc.document_hash.to_hex())
        .bind(doc.status.as_str())
        .bind(*doc.timeline.uploaded_at.as_datetime())
        .bind(&record)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
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
        self.mutate(code, |doc| doc.timeline.observe_verification(at)).await
    }

    async fn scan_by_status(&self, status: DocumentStatus) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT record, version FROM documents WHERE status = $1 ORDER BY uploaded_at, code",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    record: serde_json::Value,
    version: i64,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, StoreError> {
        serde_json::from_value(self.record).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use std::sync::Arc;

    /// Runs only when `NOTARY_TEST_DATABASE_URL` points at a scratch database.
    async fn scratch_store() -> Option<PgRecordStore> {
        let url = std::env::var("NOTARY_TEST_DATABASE_URL").ok()?;
        let pool = connect(&url).await.unwrap();
        sqlx::query(
            "DELETE FROM documents WHERE code LIKE 'AAAAAAAA-%' OR code LIKE 'BBBBBBBB-%'
             OR code LIKE 'CCCCCCCC-%'",
        )
        .execute(&pool)
        .await
        .unwrap();
        Some(PgRecordStore::new(pool))
    }

    #[tokio::test]
    async fn conformance_suite() {
        let Some(store) = scratch_store().await else {
            return;
        };
        conformance::run_all(&store).await;
        conformance::concurrent_confirmations(Arc::new(store)).await;
    }
}

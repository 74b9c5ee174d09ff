//! Store error types.

use notary_core::{BlobRef, CoreError, DocumentCode};
use thiserror::Error;

/// Error raised by a blob or record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists for the code.
    #[error("document {0} not found")]
    NotFound(DocumentCode),

    /// No blob exists under the reference.
    #[error("blob {0} not found")]
    BlobNotFound(BlobRef),

    /// A record with the same code already exists.
    #[error("document {0} already exists")]
    Conflict(DocumentCode),

    /// Optimistic update kept losing to concurrent writers.
    #[error("document {code} still contended after {attempts} attempts")]
    Contended { code: DocumentCode, attempts: u32 },

    /// A stored record could not be interpreted.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The store is configured to fail (test doubles).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

//! Engine error taxonomy.
//!
//! Only conditions that mean the system cannot do its job surface here.
//! A proof that has not matured yet is never an error; it is an
//! [`Outcome::Pending`](notary_attest::Outcome::Pending) recorded in the
//! document's lifecycle.

use notary_attest::ProofSubmissionError;
use notary_core::{CoreError, DocumentCode};
use notary_store::StoreError;
use thiserror::Error;

/// Error surfaced by an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The attestation network refused or could not take the submission.
    /// Fatal to the upload; nothing was stored.
    #[error("proof submission failed: {0}")]
    ProofSubmission(#[from] ProofSubmissionError),

    /// A blob or record store operation failed.
    #[error("storage failure: {0}")]
    Storage(StoreError),

    /// The requested document code does not exist.
    #[error("document {0} not found")]
    NotFound(DocumentCode),

    /// Every generated code collided with an existing document.
    #[error("no free document code after {attempts} attempts")]
    CodeExhausted { attempts: u32 },

    /// The caller supplied an unusable value (e.g. a filename with `/`).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(code) => Self::NotFound(code),
            other => Self::Storage(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

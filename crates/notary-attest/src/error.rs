//! Attestation error types.

use std::time::Duration;

use thiserror::Error;

/// Errors from a single attestation-network call.
#[derive(Error, Debug)]
pub enum AttestationError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The calendar returned a non-success status.
    #[error("calendar {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The network cannot currently be reached.
    #[error("attestation network unavailable: {0}")]
    Unavailable(String),

    /// The network refused the submission.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// Client construction or configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// A serialized proof or commitment path could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofFormatError {
    /// The bytes are not a valid proof document.
    #[error("malformed proof encoding: {0}")]
    Encoding(String),

    /// The proof declares a version this build does not understand.
    #[error("unsupported proof version {0}")]
    UnsupportedVersion(u32),

    /// The proof declares a hash algorithm other than sha256.
    #[error("unsupported hash algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    /// A commitment path exceeds the size limits.
    #[error("commitment path too large: {0}")]
    PathTooLarge(String),

    /// The stored commitment does not follow from the stored digest.
    #[error("commitment does not match its path")]
    InconsistentCommitment,
}

/// Proof generation failed. Fatal to the upload that requested it.
#[derive(Error, Debug)]
pub enum ProofSubmissionError {
    /// The network was unreachable or refused the digest.
    #[error("attestation network refused submission: {0}")]
    Network(#[from] AttestationError),

    /// The network did not answer in time.
    #[error("attestation submission timed out after {0:?}")]
    Timeout(Duration),

    /// The network answered with a commitment that does not follow from
    /// the submitted digest.
    #[error("attestation network returned an invalid commitment: {0}")]
    InvalidCommitment(#[from] ProofFormatError),

    /// The proof could not be serialized.
    #[error("failed to encode proof: {0}")]
    Encoding(#[from] serde_json::Error),
}

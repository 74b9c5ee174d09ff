//! # Error Types
//!
//! Errors raised while constructing or validating core values. All
//! errors use `thiserror` for derive-based `Display` and `Error`.

use thiserror::Error;

/// Error constructing or validating a core notary value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A hex-encoded digest was malformed.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// A document code did not match `XXXXXXXX-XXXXXXXX`.
    #[error("invalid document code {0:?}: expected 8 hex chars, '-', 8 hex chars")]
    InvalidCode(String),

    /// A blob reference was empty or escaped its namespace.
    #[error("invalid blob reference {0:?}")]
    InvalidBlobRef(String),

    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A document violated one of the lifecycle invariants.
    #[error("document {code} violates lifecycle invariant: {reason}")]
    InvariantViolation {
        /// The offending document code.
        code: String,
        /// Which invariant failed.
        reason: String,
    },
}

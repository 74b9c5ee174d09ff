//! # notary-core — Foundational Types for the Document Notary
//!
//! This crate defines the primitives every other notary crate builds on:
//! content digests, UTC timestamps, document codes and the document
//! lifecycle data model. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Content addressing.** A document is identified by the SHA-256 of
//!    its raw bytes. [`sha256_digest()`] is the only digest path.
//!
//! 2. **Newtype wrappers for identifiers.** `DocumentCode` and `BlobRef`
//!    are validated newtypes. No bare strings cross crate seams.
//!
//! 3. **Terminal confirmation.** `DocumentStatus::Confirmed` has no
//!    outgoing transition. `Document::check_invariants()` enforces that
//!    status, `timeline.confirmed_at` and the TIMESTAMP_CONFIRMED event
//!    always agree.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with millisecond precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `notary-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod code;
pub mod digest;
pub mod document;
pub mod error;
pub mod temporal;

pub use code::{BlobRef, DocumentCode};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use document::{
    BlockAttestation, Document, DocumentStatus, LifecycleEntry, LifecycleEvent, Timeline,
};
pub use error::CoreError;
pub use temporal::Timestamp;

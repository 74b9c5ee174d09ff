//! # notary-store — Blob and Record Stores
//!
//! The notary's two storage collaborators, as object-safe async traits
//! injected into the engine as `Arc<dyn _>`:
//!
//! - [`BlobStore`]: document content and serialized proofs by [`BlobRef`].
//! - [`RecordStore`]: document records, with the conditional status
//!   transition and lifecycle append the engine relies on.
//!
//! ## Implementations
//!
//! | Backend | Blob | Record |
//! |---------|------|--------|
//! | In-memory | [`MemoryBlobStore`] | [`MemoryRecordStore`] |
//! | Filesystem | [`FsBlobStore`] | [`FsRecordStore`] |
//! | PostgreSQL | | [`PgRecordStore`] |
//!
//! The in-memory stores carry fault-injection switches for tests.
//!
//! [`BlobRef`]: notary_core::BlobRef

pub mod blob;
pub mod error;
pub mod fs;
pub mod memory;
pub mod postgres;
pub mod record;

#[cfg(test)]
pub(crate) mod conformance;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::StoreError;
pub use fs::FsRecordStore;
pub use memory::MemoryRecordStore;
pub use postgres::{connect, PgRecordStore};
pub use record::{RecordStore, StatusTransition};

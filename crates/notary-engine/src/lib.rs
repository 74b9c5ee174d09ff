//! # notary-engine — Timestamp-Proof Lifecycle Engine
//!
//! Drives documents from a pending commitment to a confirmed, block-anchored
//! proof:
//!
//! - [`LifecycleStateMachine`]: applies resolver outcomes to persisted
//!   documents. The STAMPING → CONFIRMED transition is a compare-and-set,
//!   so racing triggers converge on exactly one confirmation.
//! - [`ReconciliationScheduler`]: one bounded pass over every STAMPING
//!   document, isolating per-document failures.
//! - [`NotaryService`]: upload, on-demand validation and reconciliation
//!   surfaces over injected collaborators.
//!
//! Upload and both validation triggers share the same state machine, so
//! the document invariants hold no matter which path touched a document.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod report;
pub mod scheduler;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use error::EngineError;
pub use lifecycle::{Applied, LifecycleStateMachine, Step, Trigger};
pub use report::{
    BatchEntry, BatchReport, EntryOutcome, UploadReceipt, ValidationReport, STAMPING_ESTIMATE,
};
pub use scheduler::ReconciliationScheduler;
pub use service::{NotaryService, UploadRequest, DEFAULT_FILENAME};

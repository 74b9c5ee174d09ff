//! # notary-attest — Attestation Network Boundary
//!
//! Everything the notary knows about the external timestamp network lives
//! here:
//!
//! - **Commitment paths** (`path.rs`): append/prepend/sha256 operations and
//!   the Merkle aggregation used by calendars.
//! - **Proof format** (`proof.rs`): the self-contained, versioned
//!   `TimestampProof` persisted next to each document.
//! - **Network trait** (`network.rs`): `submit` a digest, later `resolve` it.
//! - **Calendar client** (`calendar.rs`): HTTP implementation of the trait,
//!   retrying transient calendar answers per [`RetryPolicy`].
//! - **Mock calendar** (`mock.rs`): in-process implementation with fault
//!   injection, for tests and local runs.
//! - **ProofGenerator / ProofResolver**: the two operations the engine
//!   drives. Generation fails loudly; resolution never fails, it collapses
//!   every indeterminate condition into [`Outcome::Pending`].
//!
//! ## Crate Policy
//!
//! - Depends only on `notary-core` internally.
//! - Every network call made by the generator or resolver is bounded by a
//!   timeout.

pub mod calendar;
pub mod config;
pub mod error;
pub mod generator;
pub mod mock;
pub mod network;
pub mod path;
pub mod proof;
pub mod resolver;
pub mod retry;

pub use calendar::CalendarClient;
pub use config::{CalendarConfig, ConfigError};
pub use error::{AttestationError, ProofFormatError, ProofSubmissionError};
pub use generator::{GeneratedProof, ProofGenerator};
pub use mock::MockCalendar;
pub use network::{AttestationNetwork, NetworkResolution};
pub use path::{evaluate, MerkleTree, PathOp};
pub use proof::{CalendarAttestation, PendingCommitment, TimestampProof, PROOF_VERSION};
pub use resolver::{Outcome, PendingReason, ProofResolver};
pub use retry::RetryPolicy;

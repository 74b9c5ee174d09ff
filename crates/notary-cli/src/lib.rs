//! # notary-cli — Command-Line Surface for the Notary
//!
//! Provides the `notary` binary:
//!
//! - `notary digest FILE`: SHA-256 of a file, no network.
//! - `notary upload FILE`: notarize a file, print the receipt.
//! - `notary validate CODE`: resolve a document's proof on demand.
//! - `notary reconcile`: one reconciliation pass over STAMPING documents.
//! - `notary pending`: list documents awaiting confirmation.
//!
//! ```bash
//! export NOTARY_CALENDAR_URL=https://calendar.example
//! notary upload contract.pdf --meta author=ada
//! notary validate 2CF24DBA-5FB0A30E
//! ```

pub mod context;
pub mod digest;
pub mod document;
pub mod reconcile;

pub use context::{build_service, ServiceArgs};

//! Signet document engine -- orchestrates stage-gated, capability-gated,
//! audit-coupled operations against a `DocumentStore`.
//!
//! The engine is stateless: every operation resolves its inputs (late-entry
//! validation, directory lookups, quick-entry composition), builds a
//! mutation, and commits it through the store, where the gates and the
//! audit append run atomically. See `signet-core` for the domain model and
//! `signet-storage` for the commit contract.

mod annotate;
mod directory;
mod engine;
mod late;
mod sign;

pub use annotate::initials_entry_text;
pub use directory::{DirectoryEntry, DocumentDirectory, StaticDirectory};
pub use engine::{DocumentEngine, LateClaim};
pub use late::{build_late_entry, classify, ClaimedTime};
pub use sign::{verify_countersignature, Countersigner};

//! Signet document model -- stage-gated lifecycle, append-only field
//! annotations, capability-gated permissions, multi-party signatures, and a
//! hash-chained audit log.
//!
//! This crate is pure domain logic: no I/O, no async, no clock. The store
//! (`signet-storage`) owns durability and atomicity; the engine
//! (`signet-engine`) owns orchestration and the external collaborators.
//! Everything here is deterministic given the inputs, which is what makes
//! the commit path testable and the audit trail reconstructible.

pub mod annotation;
pub mod audit;
pub mod document;
pub mod error;
pub mod field;
pub mod mutation;
pub mod participant;
pub mod permission;
pub mod signature;
pub mod stage;

pub use annotation::{marker_label, Annotation, LateEntry, QuickResponseValue};
pub use audit::{verify_chain, AuditEvent, GENESIS_HASH};
pub use document::{AuditSummary, CommitOutcome, Document, DocumentView, FieldView};
pub use error::EngineError;
pub use field::{fold_value, Field, FieldKind, FieldValue};
pub use mutation::{DocumentMutation, Slot};
pub use participant::{Capability, CapabilitySet, Participant};
pub use permission::authorize;
pub use signature::{SignaturePolicy, SignatureRecord, SignatureRole};
pub use stage::{can_perform, OperationKind, Stage};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use signet_core::{AuditEvent, CommitOutcome, Document, DocumentMutation, EngineError};

/// Event published to subscribers after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChanged {
    pub document_id: String,
    /// Document version after the commit.
    pub version: u64,
    /// Audit sequence number of the commit.
    pub audit_seq: u64,
}

/// Result of a successful `commit_mutation`.
#[derive(Debug, Clone)]
pub struct Committed {
    pub outcome: CommitOutcome,
    /// The document state after the commit (unchanged on a no-op).
    pub document: Document,
    /// The audit event written with the commit; `None` on a no-op.
    pub event: Option<AuditEvent>,
}

/// The storage trait for document backends.
///
/// ## Atomicity
///
/// `commit_mutation` is the single mutation path and is all-or-nothing:
/// the domain mutation, the version bump, and the audit append either all
/// become durable together or none of them do. If the audit event cannot be
/// written, the backend MUST roll the whole commit back and return
/// `EngineError::Fatal`: the system never accepts a mutation it cannot
/// prove occurred. An operation abandoned before `commit_mutation` has no
/// effect; there are no partial writes to clean up.
///
/// ## Concurrency
///
/// `read_version` is the document version the caller based the request on.
/// Conflict detection is per-slot (see `Document::commit`): commits touching
/// disjoint fields or signature roles interleave freely; a commit whose slot
/// changed since `read_version` fails with `ConflictingVersion` and is
/// retried by the caller with refreshed state, never merged. Checkbox marker
/// allocation happens inside the commit critical section, so concurrent
/// checks by the same participant can never collide on a marker number.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` for use in axum
/// application state and across task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Store a freshly created document. Fails with `ValidationError` if
    /// the id is already taken.
    async fn create_document(&self, document: Document) -> Result<(), EngineError>;

    /// Read the current committed state of a document.
    async fn get_document(&self, document_id: &str) -> Result<Document, EngineError>;

    /// Atomically apply one mutation and append its audit event.
    async fn commit_mutation(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        mutation: DocumentMutation,
    ) -> Result<Committed, EngineError>;

    /// The full audit log of a document, ordered by commit sequence.
    async fn audit_log(&self, document_id: &str) -> Result<Vec<AuditEvent>, EngineError>;

    /// Ids of all stored documents.
    async fn list_documents(&self) -> Result<Vec<String>, EngineError>;

    /// Subscribe to `DocumentChanged` events across all documents. Events
    /// are published after the commit is durable.
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentChanged>;
}

/// All errors that can be returned by the document engine.
///
/// The taxonomy is deliberately small and stable; callers route on the
/// variant, not the message:
///
/// - `PermissionDenied`, `InvalidStageTransition`, `ValidationError`,
///   `NotFound` are recoverable and surfaced to the caller as-is.
/// - `ConflictingVersion` is expected under concurrency; the caller should
///   refetch the document and may resubmit.
/// - `Fatal` means the audit append could not be made durable. The mutation
///   was rolled back and the document is unchanged, but the condition must
///   be escalated because it threatens audit completeness.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    /// The actor's capability set does not allow this operation.
    #[error("permission denied: {actor} may not {operation} on document {document_id}")]
    PermissionDenied {
        document_id: String,
        actor: String,
        operation: String,
    },

    /// The operation is not reachable at the document's current stage,
    /// or the requested stage transition is not the immediate successor.
    #[error("invalid stage transition on document {document_id}: {detail}")]
    InvalidStageTransition { document_id: String, detail: String },

    /// Optimistic concurrency loss: another commit touched the same
    /// field or slot since the caller's read. Refetch and retry.
    #[error(
        "conflicting version on document {document_id}: read version {read_version}, slot changed at {slot_version}"
    )]
    ConflictingVersion {
        document_id: String,
        read_version: u64,
        slot_version: u64,
    },

    /// Malformed input: empty late-entry reason, future-dated late entry,
    /// duplicate signature, kind mismatch, and similar.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Referenced document, field, or participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Audit durability failure. The commit was rolled back whole; no
    /// partial state survives. Must be escalated, never swallowed.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    /// True for errors the caller may retry after refetching state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConflictingVersion { .. })
    }
}

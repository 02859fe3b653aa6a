//! The document engine: the one front door for every operation.
//!
//! Each operation flows the same way: resolve whatever external input it
//! needs (late-entry validation, directory lookup, quick-entry
//! composition), build a `DocumentMutation`, and hand it to the store,
//! which applies the stage gate, the permission gate, the per-slot
//! concurrency check, the domain mutation, and the audit append as one
//! atomic commit. The engine itself holds no document state and never
//! caches an authorization decision.

use std::sync::Arc;

use time::{Date, OffsetDateTime, Time};

use signet_core::{
    verify_chain, Capability, Document, DocumentMutation, DocumentView, EngineError, LateEntry,
    OperationKind, Participant, QuickResponseValue, SignaturePolicy, SignatureRecord,
    SignatureRole, Stage,
};
use signet_storage::{Committed, DocumentChanged, DocumentStore};

use crate::annotate::initials_entry_text;
use crate::directory::DocumentDirectory;
use crate::late::build_late_entry;
use crate::sign::Countersigner;

/// A backdated effective time asserted by the caller, with its
/// justification. Validated against the document's timezone before the
/// entry is committed.
#[derive(Debug, Clone)]
pub struct LateClaim {
    pub claimed_date: Date,
    pub claimed_time: Time,
    pub reason: String,
}

/// Orchestrates operations against a `DocumentStore` and the external
/// document directory.
pub struct DocumentEngine<S: DocumentStore> {
    store: Arc<S>,
    directory: Arc<dyn DocumentDirectory>,
}

impl<S: DocumentStore> DocumentEngine<S> {
    pub fn new(store: Arc<S>, directory: Arc<dyn DocumentDirectory>) -> Self {
        DocumentEngine { store, directory }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Create a document at `Setup` with the creating owner on the roster.
    pub async fn create_document(
        &self,
        document_id: &str,
        utc_offset_minutes: i32,
        policy: SignaturePolicy,
        owner: Participant,
    ) -> Result<Document, EngineError> {
        let doc = Document::new(document_id, utc_offset_minutes, policy, owner);
        self.store.create_document(doc.clone()).await?;
        Ok(doc)
    }

    pub async fn advance_stage(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        target: Stage,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::AdvanceStage { target },
            )
            .await
    }

    /// Administrative rollback; logged distinctly from a forward advance.
    pub async fn rollback_stage(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        target: Stage,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::RollbackStage { target },
            )
            .await
    }

    // ── Roster administration ───────────────────────────────────────────────

    pub async fn add_participant(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        participant: Participant,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::AddParticipant { participant },
            )
            .await
    }

    pub async fn grant_capability(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        user_id: &str,
        capability: Capability,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::GrantCapability {
                    user_id: user_id.to_string(),
                    capability,
                },
            )
            .await
    }

    pub async fn revoke_capability(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        user_id: &str,
        capability: Capability,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::RevokeCapability {
                    user_id: user_id.to_string(),
                    capability,
                },
            )
            .await
    }

    pub async fn deactivate_participant(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        user_id: &str,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::DeactivateParticipant {
                    user_id: user_id.to_string(),
                },
            )
            .await
    }

    pub async fn add_field(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        label: &str,
        kind: signet_core::FieldKind,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::AddField {
                    field_id: field_id.to_string(),
                    label: label.to_string(),
                    kind,
                },
            )
            .await
    }

    // ── Annotation operations ───────────────────────────────────────────────

    pub async fn enter_text(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        text: &str,
        late: Option<LateClaim>,
    ) -> Result<Committed, EngineError> {
        let late = self.resolve_late(document_id, late).await?;
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::EnterText {
                    field_id: field_id.to_string(),
                    text: text.to_string(),
                    machine_composed: false,
                    late,
                },
            )
            .await
    }

    /// Insert the actor's initials plus today's date, machine-composed.
    pub async fn quick_entry_initials(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
    ) -> Result<Committed, EngineError> {
        let doc = self.store.get_document(document_id).await?;
        // The actor is acting, not being referenced: absence from the
        // roster is a denial, as in `Document::commit`.
        let participant = doc
            .participant(actor)
            .ok_or_else(|| EngineError::PermissionDenied {
                document_id: document_id.to_string(),
                actor: actor.to_string(),
                operation: OperationKind::EnterText.to_string(),
            })?;
        let text = initials_entry_text(
            &participant.initials,
            doc.utc_offset_minutes,
            OffsetDateTime::now_utc(),
        )?;
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::EnterText {
                    field_id: field_id.to_string(),
                    text,
                    machine_composed: true,
                    late: None,
                },
            )
            .await
    }

    pub async fn quick_response(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        value: QuickResponseValue,
        late: Option<LateClaim>,
    ) -> Result<Committed, EngineError> {
        let late = self.resolve_late(document_id, late).await?;
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::QuickResponse {
                    field_id: field_id.to_string(),
                    value,
                    late,
                },
            )
            .await
    }

    pub async fn check_box(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        late: Option<LateClaim>,
    ) -> Result<Committed, EngineError> {
        let late = self.resolve_late(document_id, late).await?;
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::CheckBox {
                    field_id: field_id.to_string(),
                    late,
                },
            )
            .await
    }

    pub async fn correct(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        original_index: usize,
        replacement: &str,
        reason: &str,
    ) -> Result<Committed, EngineError> {
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::Correct {
                    field_id: field_id.to_string(),
                    original_index,
                    replacement: replacement.to_string(),
                    reason: reason.to_string(),
                },
            )
            .await
    }

    /// Attach a reference to another document. The reference must resolve
    /// through the external directory; only `{reference, display_name}` is
    /// stored.
    pub async fn link_document(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        field_id: &str,
        reference: &str,
    ) -> Result<Committed, EngineError> {
        let entry = self.directory.resolve(reference).await?;
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::LinkDocument {
                    field_id: field_id.to_string(),
                    reference: entry.reference,
                    display_name: entry.display_name,
                },
            )
            .await
    }

    // ── Signature protocol ──────────────────────────────────────────────────

    /// Claim a signature role. Roles sign in any order; a duplicate claim
    /// by the same participant is rejected, and a second participant on a
    /// taken role is rejected unless the policy allows co-signing. With a
    /// countersigner, the record carries an Ed25519 proof over the exact
    /// version signed against.
    pub async fn sign(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        role: SignatureRole,
        countersigner: Option<&Countersigner>,
    ) -> Result<Committed, EngineError> {
        let (signature_b64, verifying_key_b64) = match countersigner {
            Some(signer) => {
                let payload =
                    SignatureRecord::signing_payload(document_id, read_version, role, actor);
                let (sig, vk) = signer.countersign(&payload);
                (Some(sig), Some(vk))
            }
            None => (None, None),
        };
        self.store
            .commit_mutation(
                document_id,
                actor,
                read_version,
                DocumentMutation::Sign {
                    role,
                    signature_b64,
                    verifying_key_b64,
                },
            )
            .await
    }

    /// Side-effect-free: is every role the policy requires signed?
    pub async fn fully_executed(&self, document_id: &str) -> Result<bool, EngineError> {
        Ok(self.store.get_document(document_id).await?.fully_executed())
    }

    // ── Read projection ─────────────────────────────────────────────────────

    pub async fn get_document(&self, document_id: &str) -> Result<Document, EngineError> {
        self.store.get_document(document_id).await
    }

    /// The read-only view served to UIs and reporting: folded field values,
    /// stage, signatures, audit summary.
    pub async fn get_view(&self, document_id: &str) -> Result<DocumentView, EngineError> {
        let doc = self.store.get_document(document_id).await?;
        let audit = self.store.audit_log(document_id).await?;
        let head = audit.last().map(|e| e.entry_hash.clone());
        Ok(doc.view(audit.len() as u64, head))
    }

    pub async fn audit_log(
        &self,
        document_id: &str,
    ) -> Result<Vec<signet_core::AuditEvent>, EngineError> {
        self.store.audit_log(document_id).await
    }

    /// Verify the audit hash chain end to end.
    pub async fn verify_audit(&self, document_id: &str) -> Result<(), EngineError> {
        let audit = self.store.audit_log(document_id).await?;
        verify_chain(&audit)
            .map_err(|seq| EngineError::Fatal(format!("audit chain broken at seq {seq}")))
    }

    pub async fn list_documents(&self) -> Result<Vec<String>, EngineError> {
        self.store.list_documents().await
    }

    /// Live change feed across all documents.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentChanged> {
        self.store.subscribe()
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    /// Validate a late claim against the document's timezone and turn it
    /// into the metadata to attach, if the claim is actually in the past.
    async fn resolve_late(
        &self,
        document_id: &str,
        late: Option<LateClaim>,
    ) -> Result<Option<LateEntry>, EngineError> {
        let Some(claim) = late else { return Ok(None) };
        let doc = self.store.get_document(document_id).await?;
        build_late_entry(
            claim.claimed_date,
            claim.claimed_time,
            &claim.reason,
            doc.utc_offset_minutes,
            OffsetDateTime::now_utc(),
        )
    }
}

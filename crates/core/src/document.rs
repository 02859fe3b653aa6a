//! The document aggregate and its commit function.
//!
//! `Document` is the canonical versioned state: stage, fields, roster,
//! signatures, marker counters. Nothing outside this module mutates it
//! directly: the store calls `Document::commit` under its commit lock,
//! which makes the concurrency check, the stage gate, the permission gate,
//! the domain validation, and the version bump one atomic unit.
//!
//! Concurrency is per-slot, not per-document. Every mutation names the slot
//! it writes (a field, a signature role, the stage, or the roster); a commit
//! carrying a stale read version is rebased onto the current version as long
//! as its slot is untouched since that read. Stage and roster act as guard
//! slots for every mutation: a stage advance or a capability change forces
//! in-flight operations to refetch, which is what keeps authorization
//! decisions from being cached across mutations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotation::{marker_label, Annotation, LateEntry};
use crate::error::EngineError;
use crate::field::{Field, FieldKind, FieldValue};
use crate::mutation::{DocumentMutation, Slot};
use crate::participant::Participant;
use crate::permission::authorize;
use crate::signature::{SignaturePolicy, SignatureRecord};
use crate::stage::{can_perform, OperationKind, Stage};

/// The canonical versioned document state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub stage: Stage,
    /// Monotonic, bumped by exactly one per committed mutation.
    pub version: u64,
    /// Fixed UTC offset of the document's site, in minutes. Late-entry
    /// "in the past" is computed in this timezone.
    pub utc_offset_minutes: i32,
    pub fields: Vec<Field>,
    pub participants: Vec<Participant>,
    pub signatures: Vec<SignatureRecord>,
    pub policy: SignaturePolicy,
    /// Per-participant checkbox marker counters. Incremented only inside a
    /// successful commit, so committed marks are gapless and collision-free.
    pub marker_counters: BTreeMap<String, u32>,
    /// Version at which the stage last changed.
    pub stage_updated_at_version: u64,
    /// Version at which the roster last changed.
    pub roster_updated_at_version: u64,
    /// Version at which each signature role last gained a record.
    pub signature_slot_versions: BTreeMap<String, u64>,
}

/// What a successful commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied {
        operation: OperationKind,
        version_before: u64,
        version_after: u64,
    },
    /// The mutation had no effect (re-checking an already-checked box).
    /// No version bump, no audit event.
    NoOp,
}

impl Document {
    /// Create a document at `Setup` with an empty field layout and the
    /// creating owner as the only roster entry.
    pub fn new(
        document_id: impl Into<String>,
        utc_offset_minutes: i32,
        policy: SignaturePolicy,
        owner: Participant,
    ) -> Self {
        Document {
            document_id: document_id.into(),
            stage: Stage::Setup,
            version: 0,
            utc_offset_minutes,
            fields: Vec::new(),
            participants: vec![owner],
            signatures: Vec::new(),
            policy,
            marker_counters: BTreeMap::new(),
            stage_updated_at_version: 0,
            roster_updated_at_version: 0,
            signature_slot_versions: BTreeMap::new(),
        }
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Side-effect-free: is every role the policy requires signed?
    pub fn fully_executed(&self) -> bool {
        self.policy.fully_executed(&self.signatures)
    }

    /// Version at which the given slot last changed.
    fn slot_version(&self, slot: &Slot<'_>) -> u64 {
        match slot {
            Slot::Field(field_id) => self
                .field(field_id)
                .map(|f| f.updated_at_version)
                .unwrap_or(0),
            Slot::Signature(role) => self
                .signature_slot_versions
                .get(role.as_str())
                .copied()
                .unwrap_or(0),
            Slot::Stage => self.stage_updated_at_version,
            Slot::Roster => self.roster_updated_at_version,
        }
    }

    fn conflict(&self, read_version: u64, slot_version: u64) -> EngineError {
        EngineError::ConflictingVersion {
            document_id: self.document_id.clone(),
            read_version,
            slot_version,
        }
    }

    /// Apply one mutation atomically: concurrency check, stage gate,
    /// permission gate, domain validation, append, version bump.
    ///
    /// `read_version` is the document version the caller based the request
    /// on. `at` is the commit timestamp (RFC 3339), supplied by the store
    /// so a rolled-back retry gets a fresh one.
    ///
    /// On any error the document is unchanged; validation happens before
    /// the first write.
    pub fn commit(
        &mut self,
        mutation: &DocumentMutation,
        actor: &str,
        at: &str,
        read_version: u64,
    ) -> Result<CommitOutcome, EngineError> {
        let op = mutation.kind();

        // Stage gate against the stage as of this commit.
        if !can_perform(self.stage, op) {
            return Err(EngineError::InvalidStageTransition {
                document_id: self.document_id.clone(),
                detail: format!("operation {} not reachable at stage {}", op, self.stage),
            });
        }

        // Permission gate against the roster as of this commit. An actor
        // not on the roster holds no capabilities and is denied, the same
        // as a deactivated one.
        let participant = self
            .participant(actor)
            .ok_or_else(|| EngineError::PermissionDenied {
                document_id: self.document_id.clone(),
                actor: actor.to_string(),
                operation: op.to_string(),
            })?;
        authorize(&self.document_id, participant, op, mutation.claimed_role())?;

        // Re-checking an already-checked box is a visible no-op, not a
        // conflict and not an error, however stale the caller's read was.
        if let DocumentMutation::CheckBox { field_id, .. } = mutation {
            let field = self
                .field(field_id)
                .ok_or_else(|| EngineError::NotFound(format!("field '{}'", field_id)))?;
            if field.kind != FieldKind::Checkbox {
                return Err(EngineError::ValidationError(format!(
                    "field '{}' is not a checkbox",
                    field_id
                )));
            }
            if field.is_checked() {
                return Ok(CommitOutcome::NoOp);
            }
        }

        // Per-slot concurrency check: the primary slot plus the stage and
        // roster guard slots must be untouched since the caller's read.
        for slot in [mutation.slot(), Slot::Stage, Slot::Roster] {
            let slot_version = self.slot_version(&slot);
            if slot_version > read_version {
                return Err(self.conflict(read_version, slot_version));
            }
        }

        // Late-entry metadata must carry a justification.
        if let Some(late) = mutation_late(mutation) {
            if late.reason.trim().is_empty() {
                return Err(EngineError::ValidationError(
                    "late entry requires a non-empty reason".into(),
                ));
            }
        }

        let version_before = self.version;
        let version_after = version_before + 1;

        self.apply(mutation, actor, at, read_version, version_after)?;

        self.version = version_after;
        Ok(CommitOutcome::Applied {
            operation: op,
            version_before,
            version_after,
        })
    }

    /// Domain validation and the actual write. Called only from `commit`;
    /// must not mutate anything before the last possible validation error.
    fn apply(
        &mut self,
        mutation: &DocumentMutation,
        actor: &str,
        at: &str,
        read_version: u64,
        new_version: u64,
    ) -> Result<(), EngineError> {
        match mutation {
            DocumentMutation::AddField {
                field_id,
                label,
                kind,
            } => {
                if self.field(field_id).is_some() {
                    return Err(EngineError::ValidationError(format!(
                        "field '{}' already exists",
                        field_id
                    )));
                }
                let mut field = Field::new(field_id.clone(), label.clone(), *kind);
                field.updated_at_version = new_version;
                self.fields.push(field);
            }

            DocumentMutation::AddParticipant { participant } => {
                if self.participant(&participant.user_id).is_some() {
                    return Err(EngineError::ValidationError(format!(
                        "participant '{}' already on the roster",
                        participant.user_id
                    )));
                }
                self.participants.push(participant.clone());
                self.roster_updated_at_version = new_version;
            }

            DocumentMutation::GrantCapability {
                user_id,
                capability,
            } => {
                let p = self.participant_mut(user_id)?;
                p.capabilities.insert(*capability);
                self.roster_updated_at_version = new_version;
            }

            DocumentMutation::RevokeCapability {
                user_id,
                capability,
            } => {
                let p = self.participant_mut(user_id)?;
                p.capabilities.remove(capability);
                self.roster_updated_at_version = new_version;
            }

            DocumentMutation::DeactivateParticipant { user_id } => {
                let p = self.participant_mut(user_id)?;
                p.active = false;
                self.roster_updated_at_version = new_version;
            }

            DocumentMutation::EnterText {
                field_id,
                text,
                machine_composed,
                late,
            } => {
                if text.is_empty() {
                    return Err(EngineError::ValidationError("empty text entry".into()));
                }
                let annotation = Annotation::TextEntry {
                    text: text.clone(),
                    author: actor.to_string(),
                    at: at.to_string(),
                    machine_composed: *machine_composed,
                    late: late.clone(),
                };
                self.append_annotation(field_id, FieldKind::Text, annotation, new_version)?;
            }

            DocumentMutation::QuickResponse {
                field_id,
                value,
                late,
            } => {
                let annotation = Annotation::QuickResponse {
                    value: *value,
                    author: actor.to_string(),
                    at: at.to_string(),
                    late: late.clone(),
                };
                self.append_annotation(
                    field_id,
                    FieldKind::QuickResponse,
                    annotation,
                    new_version,
                )?;
            }

            DocumentMutation::CheckBox { field_id, late } => {
                // Marker allocation happens here, inside the commit, so a
                // losing concurrent attempt never consumes a number.
                let initials = self
                    .participant(actor)
                    .map(|p| p.initials.clone())
                    .unwrap_or_default();
                let counter = self.marker_counters.entry(actor.to_string()).or_insert(0);
                *counter += 1;
                let marker = *counter;
                let annotation = Annotation::CheckboxMark {
                    marker,
                    marker_label: marker_label(marker, &initials),
                    author: actor.to_string(),
                    at: at.to_string(),
                    late: late.clone(),
                };
                self.append_annotation(field_id, FieldKind::Checkbox, annotation, new_version)?;
            }

            DocumentMutation::Correct {
                field_id,
                original_index,
                replacement,
                reason,
            } => {
                if reason.trim().is_empty() {
                    return Err(EngineError::ValidationError(
                        "correction requires a non-empty reason".into(),
                    ));
                }
                if replacement.is_empty() {
                    return Err(EngineError::ValidationError(
                        "correction replacement must not be empty".into(),
                    ));
                }
                let field = self
                    .field(field_id)
                    .ok_or_else(|| EngineError::NotFound(format!("field '{}'", field_id)))?;
                let original = field.annotations.get(*original_index).ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "annotation {} on field '{}'",
                        original_index, field_id
                    ))
                })?;
                if !matches!(
                    original,
                    Annotation::TextEntry { .. }
                        | Annotation::QuickResponse { .. }
                        | Annotation::Correction { .. }
                ) {
                    return Err(EngineError::ValidationError(
                        "only text-bearing entries can be corrected".into(),
                    ));
                }
                let annotation = Annotation::Correction {
                    original_index: *original_index,
                    replacement: replacement.clone(),
                    reason: reason.clone(),
                    author: actor.to_string(),
                    at: at.to_string(),
                };
                let field = self.field_mut(field_id)?;
                field.annotations.push(annotation);
                field.updated_at_version = new_version;
            }

            DocumentMutation::LinkDocument {
                field_id,
                reference,
                display_name,
            } => {
                let annotation = Annotation::DocumentLink {
                    reference: reference.clone(),
                    display_name: display_name.clone(),
                    author: actor.to_string(),
                    at: at.to_string(),
                };
                self.append_annotation(field_id, FieldKind::Link, annotation, new_version)?;
            }

            DocumentMutation::Sign {
                role,
                signature_b64,
                verifying_key_b64,
            } => {
                if self
                    .signatures
                    .iter()
                    .any(|s| s.role == *role && s.user_id == actor)
                {
                    return Err(EngineError::ValidationError(format!(
                        "duplicate signature: {} already signed as {}",
                        actor, role
                    )));
                }
                if !self.policy.allow_cosign
                    && self.signatures.iter().any(|s| s.role == *role)
                {
                    return Err(EngineError::ValidationError(format!(
                        "role {} already signed and co-signing is not allowed",
                        role
                    )));
                }
                self.signatures.push(SignatureRecord {
                    role: *role,
                    user_id: actor.to_string(),
                    signed_at: at.to_string(),
                    // The version the signer actually read, not the commit
                    // version. That is the state the signature attests to.
                    signed_version: read_version,
                    signature_b64: signature_b64.clone(),
                    verifying_key_b64: verifying_key_b64.clone(),
                });
                self.signature_slot_versions
                    .insert(role.as_str().to_string(), new_version);
            }

            DocumentMutation::AdvanceStage { target } => {
                if self.stage.successor() != Some(*target) {
                    return Err(EngineError::InvalidStageTransition {
                        document_id: self.document_id.clone(),
                        detail: format!(
                            "cannot advance from {} to {}; next stage is {}",
                            self.stage,
                            target,
                            self.stage
                                .successor()
                                .map(|s| s.to_string())
                                .unwrap_or_else(|| "none".into()),
                        ),
                    });
                }
                self.stage = *target;
                self.stage_updated_at_version = new_version;
            }

            DocumentMutation::RollbackStage { target } => {
                if *target >= self.stage {
                    return Err(EngineError::InvalidStageTransition {
                        document_id: self.document_id.clone(),
                        detail: format!("rollback target {} is not before {}", target, self.stage),
                    });
                }
                self.stage = *target;
                self.stage_updated_at_version = new_version;
            }
        }
        Ok(())
    }

    fn append_annotation(
        &mut self,
        field_id: &str,
        expected_kind: FieldKind,
        annotation: Annotation,
        new_version: u64,
    ) -> Result<(), EngineError> {
        let field = self.field_mut(field_id)?;
        if field.kind != expected_kind {
            return Err(EngineError::ValidationError(format!(
                "field '{}' does not accept this entry kind",
                field_id
            )));
        }
        field.annotations.push(annotation);
        field.updated_at_version = new_version;
        Ok(())
    }

    fn field_mut(&mut self, field_id: &str) -> Result<&mut Field, EngineError> {
        self.fields
            .iter_mut()
            .find(|f| f.field_id == field_id)
            .ok_or_else(|| EngineError::NotFound(format!("field '{}'", field_id)))
    }

    fn participant_mut(&mut self, user_id: &str) -> Result<&mut Participant, EngineError> {
        self.participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| EngineError::NotFound(format!("participant '{}'", user_id)))
    }

    /// Build the read-only projection served to viewers.
    pub fn view(&self, audit_events: u64, audit_head: Option<String>) -> DocumentView {
        DocumentView {
            document_id: self.document_id.clone(),
            stage: self.stage,
            version: self.version,
            fully_executed: self.fully_executed(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldView {
                    field_id: f.field_id.clone(),
                    label: f.label.clone(),
                    kind: f.kind,
                    value: f.value(),
                    annotations: f.annotations.clone(),
                })
                .collect(),
            participants: self.participants.clone(),
            signatures: self.signatures.clone(),
            audit: AuditSummary {
                events: audit_events,
                head_hash: audit_head,
            },
        }
    }
}

fn mutation_late(mutation: &DocumentMutation) -> Option<&LateEntry> {
    match mutation {
        DocumentMutation::EnterText { late, .. }
        | DocumentMutation::QuickResponse { late, .. }
        | DocumentMutation::CheckBox { late, .. } => late.as_ref(),
        _ => None,
    }
}

/// Read-only projection of a document: folded values, stage, signatures,
/// audit summary. Never a mutation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    pub document_id: String,
    pub stage: Stage,
    pub version: u64,
    pub fully_executed: bool,
    pub fields: Vec<FieldView>,
    pub participants: Vec<Participant>,
    pub signatures: Vec<SignatureRecord>,
    pub audit: AuditSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldView {
    pub field_id: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: FieldValue,
    /// Full history, oldest first. Corrections appear alongside the entries
    /// they supersede.
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub events: u64,
    pub head_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Capability;

    const AT: &str = "2026-08-25T10:00:00Z";

    fn owner() -> Participant {
        Participant::new(
            "owner",
            "Avery Owner",
            "AO",
            [Capability::Owner, Capability::Executor],
        )
    }

    fn doc_in_execution() -> Document {
        let mut doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        doc.commit(
            &DocumentMutation::AddField {
                field_id: "f1".into(),
                label: "Result".into(),
                kind: FieldKind::Text,
            },
            "owner",
            AT,
            0,
        )
        .unwrap();
        doc.commit(
            &DocumentMutation::AddField {
                field_id: "cb1".into(),
                label: "Step done".into(),
                kind: FieldKind::Checkbox,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();
        doc.commit(
            &DocumentMutation::AdvanceStage {
                target: Stage::Execution,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();
        doc
    }

    #[test]
    fn new_document_starts_at_setup_version_zero() {
        let doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        assert_eq!(doc.stage, Stage::Setup);
        assert_eq!(doc.version, 0);
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn commit_bumps_version_by_one() {
        let doc = doc_in_execution();
        assert_eq!(doc.version, 3);
    }

    #[test]
    fn entry_in_setup_is_unreachable() {
        let mut doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        let err = doc
            .commit(
                &DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "x".into(),
                    machine_composed: false,
                    late: None,
                },
                "owner",
                AT,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStageTransition { .. }));
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        let err = doc
            .commit(
                &DocumentMutation::AdvanceStage {
                    target: Stage::Review,
                },
                "owner",
                AT,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStageTransition { .. }));
    }

    #[test]
    fn rollback_must_go_backward() {
        let mut doc = doc_in_execution();
        let err = doc
            .commit(
                &DocumentMutation::RollbackStage {
                    target: Stage::Review,
                },
                "owner",
                AT,
                doc.version,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStageTransition { .. }));
        doc.commit(
            &DocumentMutation::RollbackStage {
                target: Stage::Setup,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();
        assert_eq!(doc.stage, Stage::Setup);
    }

    #[test]
    fn recheck_is_a_noop_without_a_second_marker() {
        let mut doc = doc_in_execution();
        let check = DocumentMutation::CheckBox {
            field_id: "cb1".into(),
            late: None,
        };
        let first = doc.commit(&check, "owner", AT, doc.version).unwrap();
        assert!(matches!(first, CommitOutcome::Applied { .. }));
        let v = doc.version;

        // Second click, even with a stale read version: stays checked.
        let second = doc.commit(&check, "owner", AT, 0).unwrap();
        assert_eq!(second, CommitOutcome::NoOp);
        assert_eq!(doc.version, v, "no-op must not bump the version");
        let field = doc.field("cb1").unwrap();
        assert!(field.is_checked());
        assert_eq!(
            field
                .annotations
                .iter()
                .filter(|a| matches!(a, Annotation::CheckboxMark { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn stale_write_to_modified_field_conflicts() {
        let mut doc = doc_in_execution();
        let read_version = doc.version;
        let entry = DocumentMutation::EnterText {
            field_id: "f1".into(),
            text: "first".into(),
            machine_composed: false,
            late: None,
        };
        doc.commit(&entry, "owner", AT, read_version).unwrap();

        // A second writer still holding the old version loses.
        let err = doc
            .commit(
                &DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "second".into(),
                    machine_composed: false,
                    late: None,
                },
                "owner",
                AT,
                read_version,
            )
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn stale_write_to_a_different_field_is_rebased() {
        let mut doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        for (id, label) in [("f1", "Result"), ("f2", "Notes")] {
            doc.commit(
                &DocumentMutation::AddField {
                    field_id: id.into(),
                    label: label.into(),
                    kind: FieldKind::Text,
                },
                "owner",
                AT,
                doc.version,
            )
            .unwrap();
        }
        doc.commit(
            &DocumentMutation::AdvanceStage {
                target: Stage::Execution,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();

        // Both sessions read here.
        let read_version = doc.version;
        doc.commit(
            &DocumentMutation::EnterText {
                field_id: "f1".into(),
                text: "session A".into(),
                machine_composed: false,
                late: None,
            },
            "owner",
            AT,
            read_version,
        )
        .unwrap();

        // Session B writes a different field with the now-stale version;
        // the commit is rebased, not rejected.
        doc.commit(
            &DocumentMutation::EnterText {
                field_id: "f2".into(),
                text: "session B".into(),
                machine_composed: false,
                late: None,
            },
            "owner",
            AT,
            read_version,
        )
        .unwrap();
        assert_eq!(doc.version, read_version + 2);
    }

    #[test]
    fn capability_change_invalidates_stale_reads() {
        let mut doc = doc_in_execution();
        let read_version = doc.version;
        doc.commit(
            &DocumentMutation::AddParticipant {
                participant: Participant::new("u2", "Jo Park", "JP", [Capability::Executor]),
            },
            "owner",
            AT,
            read_version,
        )
        .unwrap();

        // Any mutation still holding the pre-roster-change version conflicts.
        let err = doc
            .commit(
                &DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "stale".into(),
                    machine_composed: false,
                    late: None,
                },
                "owner",
                AT,
                read_version,
            )
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn duplicate_signature_is_rejected() {
        let mut doc = doc_in_execution();
        let sign = DocumentMutation::Sign {
            role: crate::signature::SignatureRole::Executor,
            signature_b64: None,
            verifying_key_b64: None,
        };
        doc.commit(&sign, "owner", AT, doc.version).unwrap();
        let err = doc.commit(&sign, "owner", AT, doc.version).unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[test]
    fn non_roster_actor_is_denied() {
        let mut doc = doc_in_execution();
        let err = doc
            .commit(
                &DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "x".into(),
                    machine_composed: false,
                    late: None,
                },
                "stranger",
                AT,
                doc.version,
            )
            .unwrap_err();
        assert!(
            matches!(err, EngineError::PermissionDenied { ref actor, .. } if actor == "stranger"),
            "unknown actor must be denied, not treated as a missing resource: {:?}",
            err
        );
    }

    #[test]
    fn late_entry_with_empty_reason_is_rejected() {
        let mut doc = doc_in_execution();
        let err = doc
            .commit(
                &DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "backdated".into(),
                    machine_composed: false,
                    late: Some(LateEntry {
                        claimed_at: "2026-08-20T09:00:00Z".into(),
                        reason: "  ".into(),
                    }),
                },
                "owner",
                AT,
                doc.version,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[test]
    fn markers_are_sequential_per_participant() {
        let mut doc = doc_in_execution();
        doc.commit(
            &DocumentMutation::RollbackStage {
                target: Stage::Setup,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();
        for id in ["cb2", "cb3"] {
            doc.commit(
                &DocumentMutation::AddField {
                    field_id: id.into(),
                    label: id.into(),
                    kind: FieldKind::Checkbox,
                },
                "owner",
                AT,
                doc.version,
            )
            .unwrap();
        }
        doc.commit(
            &DocumentMutation::AdvanceStage {
                target: Stage::Execution,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();

        for id in ["cb1", "cb2", "cb3"] {
            doc.commit(
                &DocumentMutation::CheckBox {
                    field_id: id.into(),
                    late: None,
                },
                "owner",
                AT,
                doc.version,
            )
            .unwrap();
        }
        let labels: Vec<String> = ["cb1", "cb2", "cb3"]
            .iter()
            .map(|id| match doc.field(id).unwrap().value() {
                FieldValue::Checked { marker_label } => marker_label,
                other => panic!("expected checked, got {:?}", other),
            })
            .collect();
        assert_eq!(labels, ["*1AO", "*2AO", "*3AO"]);
    }

    #[test]
    fn view_folds_fields_and_reports_execution_status() {
        let mut doc = doc_in_execution();
        doc.commit(
            &DocumentMutation::EnterText {
                field_id: "f1".into(),
                text: "done".into(),
                machine_composed: false,
                late: None,
            },
            "owner",
            AT,
            doc.version,
        )
        .unwrap();
        let view = doc.view(4, Some("abc".into()));
        assert_eq!(view.version, doc.version);
        assert!(!view.fully_executed);
        let f1 = view.fields.iter().find(|f| f.field_id == "f1").unwrap();
        assert_eq!(
            f1.value,
            FieldValue::Text {
                text: "done".into()
            }
        );
    }
}

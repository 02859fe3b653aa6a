//! The mutation vocabulary: every way a document can change, expressed as
//! data so the store can apply it under its commit lock.
//!
//! A mutation names its primary slot (the field, signature role, stage, or
//! roster it writes); the commit-time concurrency check in
//! `Document::commit` uses that to decide whether a stale read version can
//! be rebased or must conflict.

use serde::{Deserialize, Serialize};

use crate::annotation::{LateEntry, QuickResponseValue};
use crate::field::FieldKind;
use crate::participant::{Capability, Participant};
use crate::signature::SignatureRole;
use crate::stage::{OperationKind, Stage};

/// A state-changing operation against one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentMutation {
    AddField {
        field_id: String,
        label: String,
        kind: FieldKind,
    },
    AddParticipant {
        participant: Participant,
    },
    GrantCapability {
        user_id: String,
        capability: Capability,
    },
    RevokeCapability {
        user_id: String,
        capability: Capability,
    },
    DeactivateParticipant {
        user_id: String,
    },
    EnterText {
        field_id: String,
        text: String,
        /// True when the engine composed the text on the actor's behalf
        /// (quick-entry initials); recorded so renderers can distinguish
        /// machine-inserted text from hand-typed text.
        machine_composed: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        late: Option<LateEntry>,
    },
    QuickResponse {
        field_id: String,
        value: QuickResponseValue,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        late: Option<LateEntry>,
    },
    CheckBox {
        field_id: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        late: Option<LateEntry>,
    },
    Correct {
        field_id: String,
        original_index: usize,
        replacement: String,
        reason: String,
    },
    LinkDocument {
        field_id: String,
        reference: String,
        display_name: String,
    },
    Sign {
        role: SignatureRole,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature_b64: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        verifying_key_b64: Option<String>,
    },
    AdvanceStage {
        target: Stage,
    },
    RollbackStage {
        target: Stage,
    },
}

/// The slot a mutation writes. Concurrency is per-slot: commits touching
/// disjoint slots never conflict with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<'a> {
    Field(&'a str),
    Signature(SignatureRole),
    Stage,
    Roster,
}

impl DocumentMutation {
    pub fn kind(&self) -> OperationKind {
        match self {
            DocumentMutation::AddField { .. } => OperationKind::AddField,
            DocumentMutation::AddParticipant { .. } => OperationKind::AddParticipant,
            DocumentMutation::GrantCapability { .. } => OperationKind::GrantCapability,
            DocumentMutation::RevokeCapability { .. } => OperationKind::RevokeCapability,
            DocumentMutation::DeactivateParticipant { .. } => OperationKind::DeactivateParticipant,
            DocumentMutation::EnterText { .. } => OperationKind::EnterText,
            DocumentMutation::QuickResponse { .. } => OperationKind::QuickResponse,
            DocumentMutation::CheckBox { .. } => OperationKind::CheckBox,
            DocumentMutation::Correct { .. } => OperationKind::Correct,
            DocumentMutation::LinkDocument { .. } => OperationKind::LinkDocument,
            DocumentMutation::Sign { .. } => OperationKind::Sign,
            DocumentMutation::AdvanceStage { .. } => OperationKind::AdvanceStage,
            DocumentMutation::RollbackStage { .. } => OperationKind::RollbackStage,
        }
    }

    /// The primary slot this mutation writes.
    pub fn slot(&self) -> Slot<'_> {
        match self {
            DocumentMutation::AddField { field_id, .. }
            | DocumentMutation::EnterText { field_id, .. }
            | DocumentMutation::QuickResponse { field_id, .. }
            | DocumentMutation::CheckBox { field_id, .. }
            | DocumentMutation::Correct { field_id, .. }
            | DocumentMutation::LinkDocument { field_id, .. } => Slot::Field(field_id),
            DocumentMutation::Sign { role, .. } => Slot::Signature(*role),
            DocumentMutation::AdvanceStage { .. } | DocumentMutation::RollbackStage { .. } => {
                Slot::Stage
            }
            DocumentMutation::AddParticipant { .. }
            | DocumentMutation::GrantCapability { .. }
            | DocumentMutation::RevokeCapability { .. }
            | DocumentMutation::DeactivateParticipant { .. } => Slot::Roster,
        }
    }

    /// The signature role claimed, for permission resolution.
    pub fn claimed_role(&self) -> Option<SignatureRole> {
        match self {
            DocumentMutation::Sign { role, .. } => Some(*role),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mutations_name_their_field_slot() {
        let m = DocumentMutation::CheckBox {
            field_id: "f1".into(),
            late: None,
        };
        assert_eq!(m.slot(), Slot::Field("f1"));
        assert_eq!(m.kind(), OperationKind::CheckBox);
    }

    #[test]
    fn sign_names_its_role_slot() {
        let m = DocumentMutation::Sign {
            role: SignatureRole::VerifiedBy,
            signature_b64: None,
            verifying_key_b64: None,
        };
        assert_eq!(m.slot(), Slot::Signature(SignatureRole::VerifiedBy));
        assert_eq!(m.claimed_role(), Some(SignatureRole::VerifiedBy));
    }

    #[test]
    fn mutation_serde_round_trip() {
        let m = DocumentMutation::EnterText {
            field_id: "f1".into(),
            text: "hello".into(),
            machine_composed: false,
            late: None,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["op"], "enter_text");
        let back: DocumentMutation = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);
    }
}

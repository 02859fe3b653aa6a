//! Document lifecycle stages and per-stage operation reachability.
//!
//! A document moves through a fixed total order of stages. The stage is the
//! single source of "is this operation even reachable right now": every
//! mutation checks `can_perform` before anything else, and the check is
//! repeated at commit time under the store lock so a concurrent stage
//! advance cannot let a stale operation slip through.

use serde::{Deserialize, Serialize};

/// Ordered lifecycle stages. `Complete` is terminal: every mutating
/// operation is unreachable there, and only an owner-held rollback
/// (logged distinctly) can reopen the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Setup,
    Execution,
    Review,
    Complete,
}

impl Stage {
    /// The immediate successor in the fixed order, or None at the terminal.
    pub fn successor(self) -> Option<Stage> {
        match self {
            Stage::Setup => Some(Stage::Execution),
            Stage::Execution => Some(Stage::Review),
            Stage::Review => Some(Stage::Complete),
            Stage::Complete => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Execution => "execution",
            Stage::Review => "review",
            Stage::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every state-changing operation in the engine's vocabulary. Note there is
/// no `UncheckBox`; unchecking is not an operation, which is how the
/// one-way checkbox invariant is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    AddField,
    AddParticipant,
    GrantCapability,
    RevokeCapability,
    DeactivateParticipant,
    EnterText,
    QuickResponse,
    CheckBox,
    Correct,
    LinkDocument,
    Sign,
    AdvanceStage,
    RollbackStage,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::AddField => "add_field",
            OperationKind::AddParticipant => "add_participant",
            OperationKind::GrantCapability => "grant_capability",
            OperationKind::RevokeCapability => "revoke_capability",
            OperationKind::DeactivateParticipant => "deactivate_participant",
            OperationKind::EnterText => "enter_text",
            OperationKind::QuickResponse => "quick_response",
            OperationKind::CheckBox => "check_box",
            OperationKind::Correct => "correct",
            OperationKind::LinkDocument => "link_document",
            OperationKind::Sign => "sign",
            OperationKind::AdvanceStage => "advance_stage",
            OperationKind::RollbackStage => "rollback_stage",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `op` is reachable at `stage`. Pure; consulted both by the engine
/// before dispatch and by `Document::commit` under the store lock.
pub fn can_perform(stage: Stage, op: OperationKind) -> bool {
    use OperationKind::*;
    match stage {
        // Setup: the owner lays out fields and the roster; no entries yet.
        Stage::Setup => matches!(
            op,
            AddField
                | AddParticipant
                | GrantCapability
                | RevokeCapability
                | DeactivateParticipant
                | AdvanceStage
        ),
        // Execution: entries, corrections, links, signatures, roster changes.
        Stage::Execution => matches!(
            op,
            AddParticipant
                | GrantCapability
                | RevokeCapability
                | DeactivateParticipant
                | EnterText
                | QuickResponse
                | CheckBox
                | Correct
                | LinkDocument
                | Sign
                | AdvanceStage
                | RollbackStage
        ),
        // Review: corrections and signatures only.
        Stage::Review => matches!(op, Correct | Sign | AdvanceStage | RollbackStage),
        // Complete is immutable; rollback is the one way back out.
        Stage::Complete => matches!(op, RollbackStage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_total() {
        assert!(Stage::Setup < Stage::Execution);
        assert!(Stage::Execution < Stage::Review);
        assert!(Stage::Review < Stage::Complete);
    }

    #[test]
    fn successor_chain_terminates() {
        assert_eq!(Stage::Setup.successor(), Some(Stage::Execution));
        assert_eq!(Stage::Review.successor(), Some(Stage::Complete));
        assert_eq!(Stage::Complete.successor(), None);
    }

    #[test]
    fn complete_stage_rejects_all_mutations() {
        use OperationKind::*;
        for op in [
            AddField,
            AddParticipant,
            EnterText,
            QuickResponse,
            CheckBox,
            Correct,
            LinkDocument,
            Sign,
            AdvanceStage,
        ] {
            assert!(!can_perform(Stage::Complete, op), "{op} reachable at Complete");
        }
        assert!(can_perform(Stage::Complete, RollbackStage));
    }

    #[test]
    fn setup_has_no_entry_operations() {
        assert!(!can_perform(Stage::Setup, OperationKind::EnterText));
        assert!(!can_perform(Stage::Setup, OperationKind::Sign));
        assert!(can_perform(Stage::Setup, OperationKind::AddField));
    }

    #[test]
    fn signatures_accepted_in_execution_and_review() {
        assert!(can_perform(Stage::Execution, OperationKind::Sign));
        assert!(can_perform(Stage::Review, OperationKind::Sign));
        assert!(!can_perform(Stage::Setup, OperationKind::Sign));
    }
}

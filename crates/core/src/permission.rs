//! The capability table: which capability each operation requires.
//!
//! Authorization is a pure function of the participant's capability set,
//! the operation, and (for signing) the claimed role. It is never cached:
//! the engine resolves it when a request arrives and `Document::commit`
//! resolves it again against the roster as of the commit, so a capability
//! grant or revocation takes effect on the very next operation.

use crate::error::EngineError;
use crate::participant::{Capability, Participant};
use crate::signature::SignatureRole;
use crate::stage::OperationKind;

/// Resolve whether `participant` may perform `op`. For `Sign`, `role` names
/// the signature role being claimed and decides the required capability.
pub fn authorize(
    document_id: &str,
    participant: &Participant,
    op: OperationKind,
    role: Option<SignatureRole>,
) -> Result<(), EngineError> {
    let denied = || EngineError::PermissionDenied {
        document_id: document_id.to_string(),
        actor: participant.user_id.clone(),
        operation: op.to_string(),
    };

    if !participant.active {
        return Err(denied());
    }

    use OperationKind::*;
    let allowed = match op {
        AddField | AddParticipant | GrantCapability | RevokeCapability
        | DeactivateParticipant | AdvanceStage | RollbackStage => {
            participant.has(Capability::Owner)
        }
        EnterText | QuickResponse | CheckBox | LinkDocument => {
            participant.has(Capability::Executor)
        }
        Correct => participant.has(Capability::Executor) || participant.has(Capability::Verifier),
        Sign => match role {
            Some(role) => participant.has(role.required_capability()),
            None => false,
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(denied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Participant {
        Participant::new("u1", "Dana Smith", "DS", [Capability::Executor])
    }

    #[test]
    fn executor_may_enter_text_but_not_manage_roster() {
        let p = executor();
        assert!(authorize("d", &p, OperationKind::EnterText, None).is_ok());
        assert!(matches!(
            authorize("d", &p, OperationKind::AddParticipant, None),
            Err(EngineError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn sign_requires_the_claimed_roles_capability() {
        let p = executor();
        assert!(authorize("d", &p, OperationKind::Sign, Some(SignatureRole::Executor)).is_ok());
        assert!(matches!(
            authorize("d", &p, OperationKind::Sign, Some(SignatureRole::VerifiedBy)),
            Err(EngineError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn sign_without_a_role_is_denied() {
        let p = executor();
        assert!(authorize("d", &p, OperationKind::Sign, None).is_err());
    }

    #[test]
    fn verifier_may_correct() {
        let p = Participant::new("u2", "Jo Park", "JP", [Capability::Verifier]);
        assert!(authorize("d", &p, OperationKind::Correct, None).is_ok());
        assert!(authorize("d", &p, OperationKind::CheckBox, None).is_err());
    }
}

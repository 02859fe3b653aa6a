//! Participants and their capability sets.
//!
//! A capability is an enumerated tag, not a duck-typed "does this user have
//! X" check: authorization is a pure function over the set (see the
//! `permission` module). A user may hold several capabilities on the same
//! document.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A document-scoped capability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// May fill fields, check boxes, link documents, and claim the
    /// `Executor` signature role.
    Executor,
    /// May correct entries and claim the `VerifiedBy` signature role.
    Verifier,
    /// May claim the `PerformedBy` signature role.
    Signer,
    /// Administrative: roster changes, field layout, stage control.
    Owner,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Executor => "executor",
            Capability::Verifier => "verifier",
            Capability::Signer => "signer",
            Capability::Owner => "owner",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities a participant holds on one document.
pub type CapabilitySet = BTreeSet<Capability>;

/// A named participant on a document.
///
/// Participants are never hard-deleted; deactivation preserves the
/// attribution of every annotation they already made. A deactivated
/// participant fails every authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    /// Short initials used for quick-entry text and checkbox markers,
    /// e.g. "DS" for Dana Smith.
    pub initials: String,
    pub capabilities: CapabilitySet,
    pub active: bool,
}

impl Participant {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        initials: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Participant {
            user_id: user_id.into(),
            display_name: display_name.into(),
            initials: initials.into(),
            capabilities: capabilities.into_iter().collect(),
            active: true,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.active && self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivated_participant_has_no_capabilities() {
        let mut p = Participant::new("u1", "Dana Smith", "DS", [Capability::Executor]);
        assert!(p.has(Capability::Executor));
        p.active = false;
        assert!(!p.has(Capability::Executor));
    }

    #[test]
    fn multiple_capabilities_coexist() {
        let p = Participant::new(
            "u1",
            "Dana Smith",
            "DS",
            [Capability::Executor, Capability::Owner],
        );
        assert!(p.has(Capability::Executor));
        assert!(p.has(Capability::Owner));
        assert!(!p.has(Capability::Verifier));
    }
}

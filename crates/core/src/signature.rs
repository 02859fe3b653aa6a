//! Signature roles, records, and the document's signing policy.

use serde::{Deserialize, Serialize};

use crate::participant::Capability;

/// The signature roles a document distinguishes. `PerformedBy` is the actor
/// who executed the work, `VerifiedBy` the independent checker, `Executor`
/// the party executing the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignatureRole {
    PerformedBy,
    VerifiedBy,
    Executor,
}

impl SignatureRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureRole::PerformedBy => "performed_by",
            SignatureRole::VerifiedBy => "verified_by",
            SignatureRole::Executor => "executor",
        }
    }

    /// The capability a participant must hold to claim this role.
    pub fn required_capability(self) -> Capability {
        match self {
            SignatureRole::PerformedBy => Capability::Signer,
            SignatureRole::VerifiedBy => Capability::Verifier,
            SignatureRole::Executor => Capability::Executor,
        }
    }
}

impl std::fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed signature. Immutable once created. Distinct roles and
/// distinct participants sign in any order; no relative ordering is
/// recorded or enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub role: SignatureRole,
    pub user_id: String,
    /// RFC 3339 timestamp of the commit.
    pub signed_at: String,
    /// The document version the signature was taken against.
    pub signed_version: u64,
    /// Base64 Ed25519 signature over the signing payload, when the caller
    /// supplied a signing key. Attribution fields above are authoritative
    /// either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_b64: Option<String>,
    /// Base64 Ed25519 verifying key matching `signature_b64`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_key_b64: Option<String>,
}

impl SignatureRecord {
    /// The byte payload a cryptographic countersignature covers.
    pub fn signing_payload(document_id: &str, version: u64, role: SignatureRole, user_id: &str) -> String {
        format!("{}:{}:{}:{}", document_id, version, role, user_id)
    }
}

/// Which roles a document requires before it counts as fully executed, and
/// whether a role may carry more than one signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePolicy {
    pub required_roles: Vec<SignatureRole>,
    /// When false (the default), a role already claimed by one participant
    /// rejects further claims as duplicates.
    pub allow_cosign: bool,
}

impl Default for SignaturePolicy {
    fn default() -> Self {
        SignaturePolicy {
            required_roles: vec![
                SignatureRole::PerformedBy,
                SignatureRole::VerifiedBy,
                SignatureRole::Executor,
            ],
            allow_cosign: false,
        }
    }
}

impl SignaturePolicy {
    /// Side-effect-free conjunction: every required role has at least one
    /// committed signature.
    pub fn fully_executed(&self, signatures: &[SignatureRecord]) -> bool {
        self.required_roles
            .iter()
            .all(|role| signatures.iter().any(|s| s.role == *role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: SignatureRole, user: &str) -> SignatureRecord {
        SignatureRecord {
            role,
            user_id: user.into(),
            signed_at: "2026-08-25T10:00:00Z".into(),
            signed_version: 3,
            signature_b64: None,
            verifying_key_b64: None,
        }
    }

    #[test]
    fn fully_executed_requires_every_role() {
        let policy = SignaturePolicy::default();
        let mut sigs = vec![
            record(SignatureRole::PerformedBy, "u1"),
            record(SignatureRole::VerifiedBy, "u2"),
        ];
        assert!(!policy.fully_executed(&sigs));
        sigs.push(record(SignatureRole::Executor, "u3"));
        assert!(policy.fully_executed(&sigs));
    }

    #[test]
    fn fully_executed_is_order_insensitive() {
        let policy = SignaturePolicy {
            required_roles: vec![SignatureRole::PerformedBy, SignatureRole::VerifiedBy],
            allow_cosign: false,
        };
        let ab = vec![
            record(SignatureRole::PerformedBy, "u1"),
            record(SignatureRole::VerifiedBy, "u2"),
        ];
        let ba: Vec<_> = ab.iter().rev().cloned().collect();
        assert!(policy.fully_executed(&ab));
        assert!(policy.fully_executed(&ba));
    }

    #[test]
    fn role_capability_mapping() {
        assert_eq!(
            SignatureRole::Executor.required_capability(),
            Capability::Executor
        );
        assert_eq!(
            SignatureRole::VerifiedBy.required_capability(),
            Capability::Verifier
        );
    }
}

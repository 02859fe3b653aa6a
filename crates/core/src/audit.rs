//! The append-only audit log: one event per committed mutation, ordered by
//! commit sequence, hash-chained for tamper evidence.
//!
//! The chain discipline: every event's `entry_hash` is the SHA-256 of its
//! own payload concatenated with the previous event's `entry_hash` (the
//! genesis event chains from an all-zero hash). Rewriting any historical
//! event breaks verification of every event after it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::stage::OperationKind;

/// Hash value that the first event in a chain links back to.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One committed, never-rewritten audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the document's commit sequence, starting at 0.
    pub seq: u64,
    pub document_id: String,
    pub version_before: u64,
    pub version_after: u64,
    pub operation: OperationKind,
    pub actor: String,
    /// RFC 3339 commit timestamp.
    pub at: String,
    /// `entry_hash` of the previous event, or `GENESIS_HASH` at seq 0.
    pub prev_hash: String,
    /// SHA-256 over this event's payload and `prev_hash`, hex-encoded.
    pub entry_hash: String,
}

impl AuditEvent {
    /// Build the next event in a chain, computing the hash link.
    pub fn next(
        prev: Option<&AuditEvent>,
        document_id: &str,
        version_before: u64,
        version_after: u64,
        operation: OperationKind,
        actor: &str,
        at: &str,
    ) -> AuditEvent {
        let (seq, prev_hash) = match prev {
            Some(p) => (p.seq + 1, p.entry_hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };
        let entry_hash = hash_entry(
            seq,
            document_id,
            version_before,
            version_after,
            operation,
            actor,
            at,
            &prev_hash,
        );
        AuditEvent {
            seq,
            document_id: document_id.to_string(),
            version_before,
            version_after,
            operation,
            actor: actor.to_string(),
            at: at.to_string(),
            prev_hash,
            entry_hash,
        }
    }

    /// Recompute this event's hash from its fields.
    pub fn recompute_hash(&self) -> String {
        hash_entry(
            self.seq,
            &self.document_id,
            self.version_before,
            self.version_after,
            self.operation,
            &self.actor,
            &self.at,
            &self.prev_hash,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn hash_entry(
    seq: u64,
    document_id: &str,
    version_before: u64,
    version_after: u64,
    operation: OperationKind,
    actor: &str,
    at: &str,
    prev_hash: &str,
) -> String {
    let payload = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        seq, document_id, version_before, version_after, operation, actor, at, prev_hash
    );
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Verify an event sequence: contiguous seq numbers, intact hash links,
/// correct per-event hashes. Returns the index of the first bad event.
pub fn verify_chain(events: &[AuditEvent]) -> Result<(), usize> {
    let mut prev_hash = GENESIS_HASH;
    for (i, e) in events.iter().enumerate() {
        if e.seq != i as u64 || e.prev_hash != prev_hash || e.recompute_hash() != e.entry_hash {
            return Err(i);
        }
        prev_hash = &e.entry_hash;
    }
    Ok(())
}

//! Cryptographic countersignatures for signature records.
//!
//! A signature record is authoritative through its attribution fields; the
//! Ed25519 countersignature is an additional, externally verifiable proof
//! binding the signer's key to the exact document version they signed
//! against. Keys are 32-byte Ed25519 seeds, base64 at rest (see the CLI's
//! `keygen` command).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use signet_core::{EngineError, SignatureRecord};

/// Holds a signing key and produces countersignatures over the canonical
/// signing payload.
pub struct Countersigner {
    key: SigningKey,
}

impl Countersigner {
    pub fn new(key: SigningKey) -> Self {
        Countersigner { key }
    }

    /// Generate a fresh keypair (test and demo use).
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Countersigner {
            key: SigningKey::generate(&mut rng),
        }
    }

    /// Load from a base64-encoded 32-byte seed.
    pub fn from_b64_seed(seed_b64: &str) -> Result<Self, EngineError> {
        let bytes = BASE64
            .decode(seed_b64.trim())
            .map_err(|e| EngineError::ValidationError(format!("bad signing key encoding: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EngineError::ValidationError("signing key must be 32 bytes".into()))?;
        Ok(Countersigner {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Sign the canonical payload for (document, version, role, user).
    /// Returns `(signature_b64, verifying_key_b64)`.
    pub fn countersign(&self, payload: &str) -> (String, String) {
        let signature = self.key.sign(payload.as_bytes());
        (
            BASE64.encode(signature.to_bytes()),
            BASE64.encode(self.key.verifying_key().to_bytes()),
        )
    }
}

/// Verify a record's countersignature against its own attribution fields.
/// Records without a countersignature verify trivially false.
pub fn verify_countersignature(
    document_id: &str,
    record: &SignatureRecord,
) -> Result<bool, EngineError> {
    let (Some(sig_b64), Some(vk_b64)) = (&record.signature_b64, &record.verifying_key_b64) else {
        return Ok(false);
    };
    let vk_bytes: [u8; 32] = BASE64
        .decode(vk_b64)
        .map_err(|e| EngineError::ValidationError(format!("bad verifying key: {e}")))?
        .try_into()
        .map_err(|_| EngineError::ValidationError("verifying key must be 32 bytes".into()))?;
    let vk = VerifyingKey::from_bytes(&vk_bytes)
        .map_err(|e| EngineError::ValidationError(format!("bad verifying key: {e}")))?;
    let sig_bytes: [u8; 64] = BASE64
        .decode(sig_b64)
        .map_err(|e| EngineError::ValidationError(format!("bad signature: {e}")))?
        .try_into()
        .map_err(|_| EngineError::ValidationError("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let payload = SignatureRecord::signing_payload(
        document_id,
        record.signed_version,
        record.role,
        &record.user_id,
    );
    Ok(vk.verify(payload.as_bytes(), &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::SignatureRole;

    #[test]
    fn countersignature_round_trips() {
        let signer = Countersigner::generate();
        let payload = SignatureRecord::signing_payload("doc-1", 5, SignatureRole::Executor, "u1");
        let (sig, vk) = signer.countersign(&payload);
        let record = SignatureRecord {
            role: SignatureRole::Executor,
            user_id: "u1".into(),
            signed_at: "2026-08-25T10:00:00Z".into(),
            signed_version: 5,
            signature_b64: Some(sig),
            verifying_key_b64: Some(vk),
        };
        assert!(verify_countersignature("doc-1", &record).unwrap());
        // Same record claimed against another document fails.
        assert!(!verify_countersignature("doc-2", &record).unwrap());
    }

    #[test]
    fn record_without_countersignature_verifies_false() {
        let record = SignatureRecord {
            role: SignatureRole::PerformedBy,
            user_id: "u1".into(),
            signed_at: "2026-08-25T10:00:00Z".into(),
            signed_version: 5,
            signature_b64: None,
            verifying_key_b64: None,
        };
        assert!(!verify_countersignature("doc-1", &record).unwrap());
    }

    #[test]
    fn tampered_version_fails_verification() {
        let signer = Countersigner::generate();
        let payload = SignatureRecord::signing_payload("doc-1", 5, SignatureRole::Executor, "u1");
        let (sig, vk) = signer.countersign(&payload);
        let record = SignatureRecord {
            role: SignatureRole::Executor,
            user_id: "u1".into(),
            signed_at: "2026-08-25T10:00:00Z".into(),
            signed_version: 6,
            signature_b64: Some(sig),
            verifying_key_b64: Some(vk),
        };
        assert!(!verify_countersignature("doc-1", &record).unwrap());
    }
}

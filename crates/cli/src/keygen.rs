//! `signet keygen` -- generate an Ed25519 countersigning keypair.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::SigningKey;

/// Generate a keypair and write `<prefix>.secret` (base64 32-byte seed,
/// mode 0o600 on Unix) and `<prefix>.pub` (base64 verifying key). The
/// seed file is what `Countersigner::from_b64_seed` loads; the public key
/// is what a counterparty registers to verify countersignatures.
pub fn cmd_keygen(algorithm: &str, output_prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    if algorithm != "ed25519" {
        return Err(format!("unsupported algorithm '{algorithm}'; only 'ed25519' is supported").into());
    }

    let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
    let pub_b64 = BASE64.encode(signing_key.verifying_key().to_bytes());

    let secret_path = format!("{output_prefix}.secret");
    std::fs::write(&secret_path, BASE64.encode(signing_key.to_bytes()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))?;
    }

    let pub_path = format!("{output_prefix}.pub");
    std::fs::write(&pub_path, &pub_b64)?;

    println!("Generated Ed25519 keypair: {secret_path}, {pub_path}");
    println!("Verifying key: {pub_b64}");
    Ok(())
}

//! Per-team secret encryption for the `vault/add-secret`/`vault/get-secret`
//! endpoints, grounded directly on `zvault-server::cloud::routes::secrets`'s
//! AES-256-GCM scheme.
//!
//! The entity store (`platform-entities::repository::secrets`) only moves
//! ciphertext; this module is where plaintext values exist, and only for
//! the duration of one encrypt/decrypt call.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::LifecycleError;

/// Derive a team's 32-byte secret-encryption key from the operator's root
/// key, grounded on `vaultrs-core::crypto::derive_key`'s `Hkdf<Sha256>`
/// scheme — one root key in `Config`, never one key per team on disk.
#[must_use]
pub fn derive_team_key(root_key: &[u8], team_id: Uuid) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, root_key);
    let mut derived = [0u8; 32];
    #[allow(clippy::expect_used)]
    hk.expand(team_id.as_bytes(), &mut derived)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    derived
}

/// Encrypt `plaintext` with a team's 32-byte AES-256-GCM key. Returns
/// `(ciphertext, nonce)`; the nonce is fresh per call via `OsRng`, never
/// reused (§5 shared-resource discipline extends to secret material: no
/// implicit key/nonce reuse across writes).
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] if `team_key` is not 32 bytes, or
/// [`LifecycleError::Internal`]-class error if the cipher rejects the input.
pub fn encrypt_secret(team_key: &[u8], plaintext: &str) -> Result<(Vec<u8>, Vec<u8>), LifecycleError> {
    let cipher = build_cipher(team_key)?;

    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| LifecycleError::InvalidTransition(format!("secret encryption failed: {e}")))?;

    Ok((ciphertext, nonce_bytes.to_vec()))
}

/// Decrypt a secret previously produced by [`encrypt_secret`].
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidTransition`] if the key, nonce, or
/// ciphertext do not match (wrong key, corrupted row, or tampering).
pub fn decrypt_secret(
    team_key: &[u8],
    ciphertext: &[u8],
    nonce_bytes: &[u8],
) -> Result<String, LifecycleError> {
    let cipher = build_cipher(team_key)?;

    if nonce_bytes.len() != 12 {
        return Err(LifecycleError::InvalidTransition(
            "invalid secret nonce length".to_owned(),
        ));
    }
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| LifecycleError::InvalidTransition("secret decryption failed".to_owned()))?;

    String::from_utf8(plaintext)
        .map_err(|e| LifecycleError::InvalidTransition(format!("decrypted secret is not valid UTF-8: {e}")))
}

fn build_cipher(team_key: &[u8]) -> Result<Aes256Gcm, LifecycleError> {
    if team_key.len() != 32 {
        return Err(LifecycleError::Validation {
            field: "team_key",
            reason: "must be 32 bytes for AES-256-GCM".to_owned(),
        });
    }
    Aes256Gcm::new_from_slice(team_key)
        .map_err(|e| LifecycleError::InvalidTransition(format!("cipher init failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encrypt_then_decrypt() {
        let key = [7u8; 32];
        let (ciphertext, nonce) = encrypt_secret(&key, "sk-provider-xyz").unwrap();
        let plaintext = decrypt_secret(&key, &ciphertext, &nonce).unwrap();
        assert_eq!(plaintext, "sk-provider-xyz");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key = [1u8; 32];
        let other_key = [2u8; 32];
        let (ciphertext, nonce) = encrypt_secret(&key, "value").unwrap();
        assert!(decrypt_secret(&other_key, &ciphertext, &nonce).is_err());
    }

    #[test]
    fn rejects_key_of_the_wrong_length() {
        let short_key = [0u8; 16];
        assert!(encrypt_secret(&short_key, "value").is_err());
    }

    #[test]
    fn derive_team_key_is_deterministic_and_team_scoped() {
        let root = [9u8; 32];
        let team_a = Uuid::new_v4();
        let team_b = Uuid::new_v4();

        assert_eq!(derive_team_key(&root, team_a), derive_team_key(&root, team_a));
        assert_ne!(derive_team_key(&root, team_a), derive_team_key(&root, team_b));
    }
}

//! AES-256-GCM field envelopes and PBKDF2 key derivation using `ring`.
//!
//! This module provides the cryptographic primitives for the vault:
//!
//! - **Key derivation**: PBKDF2-HMAC-SHA256 turns a user passphrase and the
//!   server-assigned user id (the salt) into a 256-bit [`MasterKey`].
//! - **Field encryption/decryption**: AES-256-GCM authenticated encryption
//!   with randomly generated 96-bit IVs, producing base64-encoded
//!   [`EncryptedField`] envelopes suitable for storage and transport.
//!
//! # Security Notes
//!
//! - IVs are generated randomly for each encryption operation and never
//!   reused under the same key. With a 96-bit IV and random generation, the
//!   probability of a collision is negligible for up to ~2^32 encryptions.
//! - The PBKDF2 iteration count is a versioned security parameter
//!   ([`KdfParams`]), not a magic constant: raising it means adding a new
//!   version, so keys derived under an older count stay derivable.
//! - The salt is the server-assigned user id. It is neither secret nor
//!   attacker-controlled; its job is key separation, so the same passphrase
//!   yields different keys for different accounts.
//! - Ciphertext length equals plaintext length plus the 16-byte tag; hiding
//!   field lengths is out of threat-model scope.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VaultError};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the AES-256-GCM IV in bytes (96 bits).
pub const IV_LEN: usize = NONCE_LEN;

/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// PBKDF2 algorithm: HMAC-SHA256.
static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// AES-256-GCM algorithm from `ring`.
static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

// ---------------------------------------------------------------------------
// KDF parameters
// ---------------------------------------------------------------------------

/// Versioned PBKDF2 parameter set.
///
/// Raising the iteration count must never break keys derived under a lower
/// count, so each count gets its own version. New data is derived with
/// [`KdfParams::CURRENT`]; old data names the version it was created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    /// PBKDF2-HMAC-SHA256, 600 000 iterations — OWASP 2023 recommendation.
    V1,
}

impl KdfParams {
    /// The parameter set used for newly derived keys.
    pub const CURRENT: KdfParams = KdfParams::V1;

    /// Iteration count for this version.
    pub fn iterations(self) -> std::num::NonZeroU32 {
        let count = match self {
            Self::V1 => 600_000,
        };
        std::num::NonZeroU32::new(count).expect("iteration count is non-zero")
    }
}

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

/// A 256-bit symmetric key scoped to AES-256-GCM.
///
/// The key is opaque: it has no serde impls, its `Debug` output redacts the
/// bytes, and the material is zeroized when the key is dropped.  It lives
/// only inside an unlocked session and is never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Generate a fresh random key.
    ///
    /// Used for tests and for contexts where the key is not passphrase-bound.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::EncryptionFailed`] if the system CSPRNG fails.
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes)
            .map_err(|_| VaultError::EncryptionFailed {
                reason: "failed to generate random key".into(),
            })?;
        Ok(Self(bytes))
    }

    fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Encrypted field envelope
// ---------------------------------------------------------------------------

/// One encrypted value: ciphertext (including the 128-bit tag) and IV, both
/// standard-base64 for storage and transport.
///
/// The JSON shape `{ "ciphertext": ..., "iv": ... }` is the wire format the
/// remote store receives for the outer bundle envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub ciphertext: String,
    pub iv: String,
}

// ---------------------------------------------------------------------------
// Nonce handling
// ---------------------------------------------------------------------------

/// A single-use nonce sequence that yields exactly one nonce and then errors.
///
/// `ring` requires a [`NonceSequence`] for sealing operations. Since we
/// generate a fresh random IV per encryption call, this wrapper ensures each
/// sealing key is used exactly once.
struct SingleNonce(Option<[u8; IV_LEN]>);

impl SingleNonce {
    fn new(bytes: [u8; IV_LEN]) -> Self {
        Self(Some(bytes))
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Derive a [`MasterKey`] from a passphrase and salt using the current
/// parameter set.
///
/// `salt` is the server-assigned user id, binding the derived key to one
/// account. Derivation is deterministic: the same passphrase and salt always
/// produce the same key.
///
/// # Errors
///
/// Returns [`VaultError::KeyDerivationFailed`] if the passphrase or salt is
/// empty.
pub fn derive_master_key(passphrase: &str, salt: &str) -> Result<MasterKey> {
    derive_master_key_with(KdfParams::CURRENT, passphrase, salt)
}

/// Derive a [`MasterKey`] under an explicit [`KdfParams`] version.
///
/// Use this to re-derive keys created before the current parameter set.
pub fn derive_master_key_with(params: KdfParams, passphrase: &str, salt: &str) -> Result<MasterKey> {
    if passphrase.is_empty() {
        return Err(VaultError::KeyDerivationFailed {
            reason: "passphrase must not be empty".into(),
        });
    }
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed {
            reason: "salt must not be empty".into(),
        });
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        PBKDF2_ALG,
        params.iterations(),
        salt.as_bytes(),
        passphrase.as_bytes(),
        &mut key,
    );

    tracing::debug!(params = ?params, "derived master key via PBKDF2");

    Ok(MasterKey(key))
}

// ---------------------------------------------------------------------------
// Field encryption
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under `key`, returning a fresh [`EncryptedField`].
///
/// A random 96-bit IV is generated per call; the returned ciphertext includes
/// the 128-bit authentication tag appended by `ring`.
///
/// # Errors
///
/// Returns [`VaultError::EncryptionFailed`] if the CSPRNG or `ring` reports
/// a failure.
pub fn encrypt_field(plaintext: &str, key: &MasterKey) -> Result<EncryptedField> {
    let rng = SystemRandom::new();

    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv).map_err(|_| VaultError::EncryptionFailed {
        reason: "failed to generate random IV".into(),
    })?;

    let unbound_key =
        UnboundKey::new(AEAD_ALG, key.bytes()).map_err(|_| VaultError::EncryptionFailed {
            reason: "failed to create AES-256-GCM key".into(),
        })?;

    let mut sealing_key = SealingKey::new(unbound_key, SingleNonce::new(iv));

    // `ring` encrypts in-place and appends the authentication tag.
    let mut in_out = plaintext.as_bytes().to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    tracing::trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = in_out.len(),
        "encrypted field"
    );

    Ok(EncryptedField {
        ciphertext: BASE64.encode(&in_out),
        iv: BASE64.encode(iv),
    })
}

/// Decrypt an [`EncryptedField`] under `key`, returning the plaintext.
///
/// # Errors
///
/// Returns [`VaultError::DecryptionFailed`] if the base64 is malformed, the
/// IV has the wrong length, authentication fails (wrong key or tampered
/// ciphertext), or the plaintext is not valid UTF-8. Corrupted plaintext is
/// never returned.
pub fn decrypt_field(field: &EncryptedField, key: &MasterKey) -> Result<String> {
    let ciphertext = BASE64
        .decode(&field.ciphertext)
        .map_err(|e| VaultError::DecryptionFailed {
            reason: format!("malformed base64 ciphertext: {e}"),
        })?;
    let iv_bytes = BASE64
        .decode(&field.iv)
        .map_err(|e| VaultError::DecryptionFailed {
            reason: format!("malformed base64 IV: {e}"),
        })?;

    if iv_bytes.len() != IV_LEN {
        return Err(VaultError::DecryptionFailed {
            reason: format!("IV is {} bytes, expected {}", iv_bytes.len(), IV_LEN),
        });
    }

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&iv_bytes);

    let unbound_key =
        UnboundKey::new(AEAD_ALG, key.bytes()).map_err(|_| VaultError::DecryptionFailed {
            reason: "failed to create AES-256-GCM key".into(),
        })?;

    let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(iv));

    let mut in_out = ciphertext;
    let plaintext = opening_key
        .open_in_place(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptionFailed {
            reason: "authentication failed — wrong key or corrupted data".into(),
        })?;

    let result = String::from_utf8(plaintext.to_vec()).map_err(|_| VaultError::DecryptionFailed {
        reason: "decrypted data is not valid UTF-8".into(),
    })?;

    tracing::trace!(plaintext_len = result.len(), "decrypted field");

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = MasterKey::generate().unwrap();
        let plaintext = "Jane Doe, 123 Main St";

        let envelope = encrypt_field(plaintext, &key).unwrap();
        let decrypted = decrypt_field(&envelope, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn repeated_encryption_uses_fresh_ivs() {
        let key = MasterKey::generate().unwrap();

        let a = encrypt_field("same plaintext", &key).unwrap();
        let b = encrypt_field("same plaintext", &key).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let key1 = MasterKey::generate().unwrap();
        let key2 = MasterKey::generate().unwrap();

        let envelope = encrypt_field("secret data", &key1).unwrap();
        let result = decrypt_field(&envelope, &key2);

        assert!(matches!(result, Err(VaultError::DecryptionFailed { .. })));
    }

    #[test]
    fn decrypt_with_tampered_ciphertext_fails() {
        let key = MasterKey::generate().unwrap();
        let mut envelope = encrypt_field("secret data", &key).unwrap();

        // Flip a character in the base64 ciphertext.
        let mut raw = BASE64.decode(&envelope.ciphertext).unwrap();
        raw[0] ^= 0x01;
        envelope.ciphertext = BASE64.encode(&raw);

        let result = decrypt_field(&envelope, &key);
        assert!(matches!(result, Err(VaultError::DecryptionFailed { .. })));
    }

    #[test]
    fn decrypt_rejects_malformed_base64() {
        let key = MasterKey::generate().unwrap();
        let envelope = EncryptedField {
            ciphertext: "not base64 !!!".into(),
            iv: "also not base64 !!!".into(),
        };

        let result = decrypt_field(&envelope, &key);
        assert!(matches!(result, Err(VaultError::DecryptionFailed { .. })));
    }

    #[test]
    fn decrypt_rejects_wrong_iv_length() {
        let key = MasterKey::generate().unwrap();
        let mut envelope = encrypt_field("data", &key).unwrap();
        envelope.iv = BASE64.encode([0u8; 8]);

        let result = decrypt_field(&envelope, &key);
        assert!(matches!(result, Err(VaultError::DecryptionFailed { .. })));
    }

    #[test]
    fn derivation_is_deterministic() {
        let key1 = derive_master_key("correct horse battery staple", "user-42").unwrap();
        let key2 = derive_master_key("correct horse battery staple", "user-42").unwrap();

        // Opaque keys cannot be compared directly; equality is observed
        // through interchangeable decryption.
        let envelope = encrypt_field("hello", &key1).unwrap();
        assert_eq!(decrypt_field(&envelope, &key2).unwrap(), "hello");
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let key_a = derive_master_key("same passphrase", "user-a").unwrap();
        let key_b = derive_master_key("same passphrase", "user-b").unwrap();

        let envelope = encrypt_field("hello", &key_a).unwrap();
        assert!(decrypt_field(&envelope, &key_b).is_err());
    }

    #[test]
    fn empty_passphrase_rejected() {
        let result = derive_master_key("", "user-42");
        assert!(matches!(
            result,
            Err(VaultError::KeyDerivationFailed { .. })
        ));
    }

    #[test]
    fn empty_salt_rejected() {
        let result = derive_master_key("passphrase", "");
        assert!(matches!(
            result,
            Err(VaultError::KeyDerivationFailed { .. })
        ));
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let key = MasterKey::generate().unwrap();

        let envelope = encrypt_field("", &key).unwrap();
        assert_eq!(decrypt_field(&envelope, &key).unwrap(), "");
    }

    #[test]
    fn envelope_serde_wire_shape() {
        let envelope = EncryptedField {
            ciphertext: "Y2lwaGVy".into(),
            iv: "aXY=".into(),
        };

        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"ciphertext":"Y2lwaGVy","iv":"aXY="}"#);

        let back: EncryptedField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn master_key_debug_is_redacted() {
        let key = MasterKey::generate().unwrap();
        assert_eq!(format!("{key:?}"), "MasterKey(..)");
    }
}

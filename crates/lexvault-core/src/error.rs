//! Core vault error types.
//!
//! All cryptographic operations surface errors through [`VaultError`], which
//! is the single error type returned by every public API in this crate.  Each
//! variant carries enough context for callers to decide how to handle the
//! failure without inspecting opaque strings.

/// Unified error type for the LexVault cryptographic core.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Key derivation failed (e.g. empty passphrase or salt).
    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },

    /// Encryption failed (e.g. ring internal error, RNG failure).
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed (wrong key, corrupted ciphertext, bad IV, or a
    /// malformed envelope).  The plaintext is never partially returned.
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, VaultError>;

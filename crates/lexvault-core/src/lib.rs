//! Cryptographic core for LexVault.
//!
//! This crate provides the security-bearing primitives of the LexVault
//! encrypted document-field vault: passphrase-based key derivation,
//! authenticated per-field encryption, the static sensitivity policy, and
//! the in-memory session model. It performs no storage or network I/O.
//!
//! # Modules
//!
//! - [`crypto`] — AES-256-GCM field envelopes, PBKDF2 key derivation.
//! - [`sensitivity`] — field-name → Public/Sensitive classification.
//! - [`session`] — unlocked-vault session owning the master key.
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lexvault_core::crypto::{decrypt_field, derive_master_key, encrypt_field};
//! use lexvault_core::sensitivity::SensitivityRegistry;
//!
//! # fn example() -> lexvault_core::error::Result<()> {
//! // Derive a master key: the salt is the server-assigned user id.
//! let key = derive_master_key("correct horse battery staple", "user-42")?;
//!
//! // Encrypt a sensitive field.
//! let registry = SensitivityRegistry::default();
//! assert!(registry.is_sensitive("contractor_name"));
//!
//! let envelope = encrypt_field("Jane Doe", &key)?;
//! assert_eq!(decrypt_field(&envelope, &key)?, "Jane Doe");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod sensitivity;
pub mod session;

// Re-export the most commonly used types at the crate root for convenience.
pub use crypto::{EncryptedField, KdfParams, MasterKey};
pub use error::{Result, VaultError};
pub use sensitivity::{Sensitivity, SensitivityRegistry};
pub use session::Session;

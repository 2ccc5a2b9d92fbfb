//! Local encrypted field store for LexVault.
//!
//! This crate persists document-field values in a single SQLite table.
//! Writes are gated by the sensitivity policy from `lexvault-core`:
//! sensitive fields are sealed into AES-256-GCM envelopes before touching
//! disk, public fields are stored as plaintext metadata. The store exposes
//! an async API; all SQLite work runs on the blocking thread pool.
//!
//! # Modules
//!
//! - [`store`] — the [`VaultStore`] itself.
//! - [`entry`] — the tagged [`VaultEntry`] row model.
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lexvault_core::{MasterKey, SensitivityRegistry};
//! use lexvault_store::VaultStore;
//!
//! # async fn example() -> lexvault_store::StoreResult<()> {
//! let key = MasterKey::generate()?;
//! let store = VaultStore::open("data/vault.db", SensitivityRegistry::default())?;
//!
//! store.put("contractor_name", "Jane Doe", &key).await?;
//! assert_eq!(
//!     store.get("contractor_name", &key).await?.as_deref(),
//!     Some("Jane Doe"),
//! );
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod error;
pub mod store;

// Re-export the most commonly used types at the crate root for convenience.
pub use entry::VaultEntry;
pub use error::{StoreError, StoreResult};
pub use store::VaultStore;

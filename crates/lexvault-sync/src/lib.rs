//! Remote synchronization and device identity for LexVault.
//!
//! This crate owns everything that leaves the machine: the device
//! registration handshake, the encrypted bundle backup/restore protocol, and
//! the persisted device identity. The server is modeled as two narrow trait
//! seams ([`RemoteVault`], [`DeviceRegistry`]) with a reqwest implementation
//! ([`HttpRemote`]); the vault remains fully usable offline when the remote
//! leg fails.
//!
//! # Modules
//!
//! - [`agent`] — [`SyncAgent`]: bundle assembly, backup, restore.
//! - [`client`] — wire types, collaborator traits, HTTP implementation.
//! - [`device`] — persisted per-device identity and token.
//! - [`session`] — the unlock flow (register → persist → derive).
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lexvault_core::SensitivityRegistry;
//! use lexvault_store::VaultStore;
//! use lexvault_sync::{DeviceIdentity, HttpRemote, SyncAgent, unlock};
//!
//! # async fn example() -> lexvault_sync::SyncResult<()> {
//! let remote = Arc::new(HttpRemote::new("https://vault.example.com".parse()?));
//! let mut identity = DeviceIdentity::load_or_create("data".as_ref())?;
//!
//! let session = unlock(
//!     remote.as_ref(),
//!     &mut identity,
//!     "user@example.com",
//!     "correct horse battery staple",
//!     None,
//! )
//! .await?;
//!
//! let store = VaultStore::open("data/vault.db", SensitivityRegistry::default())?;
//! let agent = SyncAgent::new(store, remote);
//!
//! let report = agent
//!     .backup(session.user_id(), session.master_key(), "Acme Corp")
//!     .await?;
//! assert!(report.success);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod device;
pub mod error;
pub mod session;

// Re-export the most commonly used types at the crate root for convenience.
pub use agent::{BackupReport, SyncAgent};
pub use client::{DeviceRegistry, HttpRemote, RemoteVault};
pub use device::DeviceIdentity;
pub use error::{SyncError, SyncResult};
pub use session::unlock;

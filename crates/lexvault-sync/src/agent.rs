//! Bundle backup and restore.
//!
//! The [`SyncAgent`] snapshots the entire local store into one bundle, seals
//! it under the master key, and ships it to the remote store. Restore is the
//! exact inverse. Two properties shape the error handling:
//!
//! - **Local-first**: remote failures during backup are folded into a
//!   structured [`BackupReport`] instead of an error — the local vault stays
//!   fully usable offline and the caller may retry later.
//! - **No partial trust**: an authentication failure anywhere inside a
//!   fetched bundle aborts the restore before a single local write.
//!
//! Sensitive fields inside a bundle keep their individual envelopes, and the
//! serialized bundle is enveloped once more — so sensitive data is encrypted
//! twice on the wire while public metadata is covered by the outer layer
//! only.

use std::collections::BTreeMap;
use std::sync::Arc;

use lexvault_core::crypto::{decrypt_field, encrypt_field};
use lexvault_core::{EncryptedField, MasterKey};
use lexvault_store::{VaultEntry, VaultStore};

use crate::client::{RemoteVault, SaveVaultRequest};
use crate::error::{SyncError, SyncResult};

/// Outcome of a backup attempt.
///
/// `success: false` means the remote leg failed; the local store is
/// untouched and remains authoritative.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub success: bool,
    /// Server-assigned id of the stored bundle.
    pub id: Option<String>,
    /// Whether the server reached its secondary object storage.
    pub cloud_synced: bool,
    pub error: Option<String>,
}

/// Bundles the local store and synchronizes it with the remote store.
pub struct SyncAgent {
    store: VaultStore,
    remote: Arc<dyn RemoteVault>,
}

impl SyncAgent {
    /// Create an agent over `store` that ships bundles to `remote`.
    pub fn new(store: VaultStore, remote: Arc<dyn RemoteVault>) -> Self {
        Self { store, remote }
    }

    /// Snapshot the local store, seal it, and upload it.
    ///
    /// `owner_name` travels as public metadata next to the opaque payload.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for local failures (store read, serialization,
    /// encryption). Remote failures produce `Ok(BackupReport { success:
    /// false, .. })`.
    pub async fn backup(
        &self,
        user_id: &str,
        key: &MasterKey,
        owner_name: &str,
    ) -> SyncResult<BackupReport> {
        let bundle = self.store.entries().await?;
        let serialized = serde_json::to_string(&bundle)?;
        let envelope = encrypt_field(&serialized, key)?;

        let request = SaveVaultRequest {
            user_id: user_id.to_string(),
            owner_name: owner_name.to_string(),
            data: serde_json::to_string(&envelope)?,
        };

        tracing::info!(fields = bundle.len(), user_id = user_id, "backing up vault bundle");

        match self.remote.save(&request).await {
            Ok(response) if response.success => Ok(BackupReport {
                success: true,
                id: response.id,
                cloud_synced: response.cloud_synced,
                error: None,
            }),
            Ok(response) => Ok(BackupReport {
                success: false,
                id: None,
                cloud_synced: false,
                error: response
                    .error
                    .or_else(|| Some("remote store rejected the bundle".into())),
            }),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "vault backup failed; local store remains authoritative"
                );
                Ok(BackupReport {
                    success: false,
                    id: None,
                    cloud_synced: false,
                    error: Some(err.to_string()),
                })
            }
        }
    }

    /// Fetch the remote bundle and repopulate the local store from it.
    ///
    /// Every inner envelope is decrypted before any local write; a failed
    /// authentication anywhere means the bundle cannot be trusted and the
    /// local store is left untouched. On success the store is cleared and
    /// refilled (sensitive fields are re-encrypted under fresh IVs on the
    /// way in). Returns the number of fields restored.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] if no remote vault exists for `user_id`;
    /// [`SyncError::Crypto`] if the outer or any inner envelope fails to
    /// decrypt.
    pub async fn restore(&self, user_id: &str, key: &MasterKey) -> SyncResult<usize> {
        let stored = self
            .remote
            .fetch(user_id)
            .await?
            .ok_or_else(|| SyncError::NotFound {
                user_id: user_id.to_string(),
            })?;

        let envelope: EncryptedField = serde_json::from_str(&stored.data)?;
        let serialized = decrypt_field(&envelope, key)?;
        let bundle: BTreeMap<String, VaultEntry> = serde_json::from_str(&serialized)?;

        // Decrypt the whole bundle up front; nothing is written until every
        // envelope has authenticated.
        let mut plaintexts = BTreeMap::new();
        for (field, entry) in bundle {
            let value = match entry {
                VaultEntry::Plain { value } => value,
                VaultEntry::Encrypted { ciphertext, iv } => {
                    decrypt_field(&EncryptedField { ciphertext, iv }, key)?
                }
            };
            plaintexts.insert(field, value);
        }

        self.store.clear().await?;
        self.store.put_all(&plaintexts, key).await?;

        tracing::info!(
            fields = plaintexts.len(),
            user_id = user_id,
            "restored vault from remote bundle"
        );
        Ok(plaintexts.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! SQLite-backed local vault store.
//!
//! The [`VaultStore`] holds one logical table, `vault_items`, keyed by field
//! name. Every write is gated by the sensitivity registry: sensitive values
//! are encrypted into envelopes before they reach SQLite, public values are
//! stored as plaintext. Reads undo exactly that.
//!
//! The store wraps its `rusqlite::Connection` in an `Arc<Mutex<_>>` and
//! dispatches all database work onto the blocking thread pool via
//! `tokio::task::spawn_blocking`, so the async callers never block the
//! runtime. Cryptography happens on the caller's side of that boundary —
//! the master key is never moved into a blocking task.
//!
//! # Schema
//!
//! ```text
//! vault_items (
//!     field      TEXT PRIMARY KEY,
//!     entry      TEXT NOT NULL,      -- VaultEntry as tagged JSON
//!     created_at INTEGER NOT NULL,
//!     updated_at INTEGER NOT NULL
//! )
//! ```
//!
//! Schema migration is automatic: [`VaultStore::open`] creates or upgrades
//! the database as needed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use lexvault_core::crypto::{decrypt_field, encrypt_field};
use lexvault_core::{EncryptedField, MasterKey, Sensitivity, SensitivityRegistry};

use crate::entry::VaultEntry;
use crate::error::{StoreError, StoreResult};

/// Local encrypted field store backed by SQLite.
///
/// Cloning is cheap (shared connection); the design still assumes one
/// unlock → one sequence of operations → one lock, with no concurrent
/// sessions racing the same store.
#[derive(Clone)]
pub struct VaultStore {
    conn: Arc<Mutex<Connection>>,
    registry: Arc<SensitivityRegistry>,
}

impl VaultStore {
    /// Open (or create) a vault store at `path`, classifying writes with
    /// `registry`.
    ///
    /// Runs schema migrations automatically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database cannot be opened, or
    /// [`StoreError::MigrationFailed`] if schema setup fails.
    pub fn open(path: impl AsRef<Path>, registry: SensitivityRegistry) -> StoreResult<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening vault store");

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry: Arc::new(registry),
        })
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory(registry: SensitivityRegistry) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        Self::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry: Arc::new(registry),
        })
    }

    /// Configure SQLite pragmas for performance and safety.
    fn configure_connection(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Run database schema migrations.
    fn run_migrations(conn: &Connection) -> StoreResult<()> {
        tracing::debug!("running vault store schema migrations");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vault_items (
                field      TEXT PRIMARY KEY,
                entry      TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| StoreError::MigrationFailed {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// The registry this store classifies writes with.
    pub fn registry(&self) -> &SensitivityRegistry {
        &self.registry
    }

    // -- Field operations ----------------------------------------------------

    /// Store one field, encrypting the value first when the field classifies
    /// as sensitive. Overwrites any prior entry for that field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Crypto`] if encryption fails, or
    /// [`StoreError::Database`] on a storage failure.
    pub async fn put(&self, field: &str, value: &str, key: &MasterKey) -> StoreResult<()> {
        let sensitivity = self.registry.classify(field);
        let entry = match sensitivity {
            Sensitivity::Sensitive => VaultEntry::from(encrypt_field(value, key)?),
            Sensitivity::Public => VaultEntry::Plain {
                value: value.to_string(),
            },
        };
        let json = serde_json::to_string(&entry)?;

        let field_owned = field.to_string();
        self.execute(move |conn| {
            let now = Utc::now().timestamp();
            conn.execute(
                "INSERT INTO vault_items (field, entry, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(field) DO UPDATE SET
                     entry = excluded.entry,
                     updated_at = excluded.updated_at",
                params![field_owned, json, now],
            )?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            field = field,
            sensitivity = ?sensitivity,
            "stored vault item"
        );
        Ok(())
    }

    /// Read one field, decrypting it if it was stored as an envelope.
    ///
    /// Returns `None` if the field is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Crypto`] when authentication of a stored
    /// envelope fails (wrong key or corrupted data).
    pub async fn get(&self, field: &str, key: &MasterKey) -> StoreResult<Option<String>> {
        let field_owned = field.to_string();
        let row: Option<String> = self
            .execute(move |conn| {
                let entry = conn
                    .query_row(
                        "SELECT entry FROM vault_items WHERE field = ?1",
                        params![field_owned],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(entry)
            })
            .await?;

        let Some(json) = row else {
            return Ok(None);
        };

        let entry: VaultEntry = serde_json::from_str(&json)?;
        match entry {
            VaultEntry::Plain { value } => Ok(Some(value)),
            VaultEntry::Encrypted { ciphertext, iv } => {
                let envelope = EncryptedField { ciphertext, iv };
                Ok(Some(decrypt_field(&envelope, key)?))
            }
        }
    }

    /// Apply [`put`](Self::put) for every entry of `fields`, in key order.
    ///
    /// NOT atomic across fields: a mid-sequence failure leaves the earlier
    /// writes in place and returns [`StoreError::PartialWrite`] naming them,
    /// so the caller can retry only the remainder.
    pub async fn put_all(
        &self,
        fields: &BTreeMap<String, String>,
        key: &MasterKey,
    ) -> StoreResult<()> {
        let mut written: Vec<String> = Vec::with_capacity(fields.len());

        for (field, value) in fields {
            if let Err(err) = self.put(field, value, key).await {
                return Err(StoreError::PartialWrite {
                    written,
                    failed_field: field.clone(),
                    reason: err.to_string(),
                });
            }
            written.push(field.clone());
        }

        tracing::debug!(count = written.len(), "bulk-stored vault items");
        Ok(())
    }

    /// All stored entries in their raw form — no decryption.
    ///
    /// Used by the sync agent to assemble a backup bundle; the ordering of
    /// the returned map is the bundle ordering.
    pub async fn entries(&self) -> StoreResult<BTreeMap<String, VaultEntry>> {
        let rows: Vec<(String, String)> = self
            .execute(|conn| {
                let mut stmt =
                    conn.prepare("SELECT field, entry FROM vault_items ORDER BY field")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut entries = BTreeMap::new();
        for (field, json) in rows {
            entries.insert(field, serde_json::from_str(&json)?);
        }
        Ok(entries)
    }

    /// Remove every stored field. Idempotent.
    pub async fn clear(&self) -> StoreResult<()> {
        let removed: usize = self
            .execute(|conn| Ok(conn.execute("DELETE FROM vault_items", [])?))
            .await?;

        tracing::info!(removed = removed, "cleared vault store");
        Ok(())
    }

    // -- Internal helpers ----------------------------------------------------

    /// Run a closure against the connection on the blocking thread pool.
    async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> VaultStore {
        VaultStore::open_in_memory(SensitivityRegistry::default()).unwrap()
    }

    fn test_key() -> MasterKey {
        MasterKey::generate().unwrap()
    }

    #[tokio::test]
    async fn public_field_stored_as_plaintext() {
        let store = test_store();
        let key = test_key();

        store.put("owner_name", "Acme Corp", &key).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(
            entries["owner_name"],
            VaultEntry::Plain {
                value: "Acme Corp".into()
            }
        );
        assert_eq!(
            store.get("owner_name", &key).await.unwrap().as_deref(),
            Some("Acme Corp")
        );
    }

    #[tokio::test]
    async fn sensitive_field_stored_as_envelope() {
        let store = test_store();
        let key = test_key();

        store.put("contractor_name", "Jane Doe", &key).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert!(entries["contractor_name"].is_encrypted());

        assert_eq!(
            store
                .get("contractor_name", &key)
                .await
                .unwrap()
                .as_deref(),
            Some("Jane Doe")
        );
    }

    #[tokio::test]
    async fn get_absent_field_returns_none() {
        let store = test_store();
        let key = test_key();

        assert_eq!(store.get("missing", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_prior_entry() {
        let store = test_store();
        let key = test_key();

        store.put("contractor_name", "Jane Doe", &key).await.unwrap();
        store.put("contractor_name", "John Roe", &key).await.unwrap();

        assert_eq!(
            store
                .get("contractor_name", &key)
                .await
                .unwrap()
                .as_deref(),
            Some("John Roe")
        );
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_with_wrong_key_fails_for_sensitive_field() {
        let store = test_store();
        let key = test_key();
        let other = test_key();

        store.put("ssn", "123-45-6789", &key).await.unwrap();

        let result = store.get("ssn", &other).await;
        assert!(matches!(
            result,
            Err(StoreError::Crypto(
                lexvault_core::VaultError::DecryptionFailed { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn put_all_writes_every_field() {
        let store = test_store();
        let key = test_key();

        let mut fields = BTreeMap::new();
        fields.insert("owner_name".to_string(), "Acme Corp".to_string());
        fields.insert("contractor_name".to_string(), "Jane Doe".to_string());
        fields.insert("compensation".to_string(), "5000 USD".to_string());

        store.put_all(&fields, &key).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(!entries["owner_name"].is_encrypted());
        assert!(entries["contractor_name"].is_encrypted());
        assert!(entries["compensation"].is_encrypted());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = test_store();
        let key = test_key();

        store.put("owner_name", "Acme Corp", &key).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.entries().await.unwrap().is_empty());

        store.clear().await.unwrap();
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_all_reports_written_fields_on_failure() {
        let store = test_store();
        let key = test_key();

        // Sabotage the table so every subsequent write fails.
        store
            .execute(|conn| {
                conn.execute_batch("DROP TABLE vault_items;")?;
                Ok(())
            })
            .await
            .unwrap();

        let mut fields = BTreeMap::new();
        fields.insert("owner_name".to_string(), "Acme Corp".to_string());
        fields.insert("ssn".to_string(), "123-45-6789".to_string());

        let err = store.put_all(&fields, &key).await.unwrap_err();
        match err {
            StoreError::PartialWrite {
                written,
                failed_field,
                ..
            } => {
                assert!(written.is_empty());
                assert_eq!(failed_field, "owner_name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn custom_registry_controls_classification() {
        let mut registry = SensitivityRegistry::default();
        registry.insert("case_number", Sensitivity::Sensitive);
        let store = VaultStore::open_in_memory(registry).unwrap();
        let key = test_key();

        store.put("case_number", "2026-CV-0042", &key).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert!(entries["case_number"].is_encrypted());
    }
}

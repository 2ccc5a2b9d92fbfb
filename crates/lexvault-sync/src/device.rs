//! Device identity and token persistence.
//!
//! Each installation gets a long-lived random fingerprint, created once on
//! first use and stable thereafter. The fingerprint is sent alongside the
//! user's email during unlock as a weak secondary authentication signal —
//! it is a convenience identity, NOT a cryptographic credential, and the
//! server must never treat it as proof of authorization.
//!
//! The identity file also carries the opaque session token and the
//! server-assigned user id from the last successful registration, so
//! subsequent commands can re-derive the master key without another
//! round-trip.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncResult;

/// File name of the persisted identity inside the data directory.
const DEVICE_FILE: &str = "device.json";

/// On-disk shape of the identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceRecord {
    fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    created_at: DateTime<Utc>,
}

/// Persisted per-device identity.
pub struct DeviceIdentity {
    path: PathBuf,
    record: DeviceRecord,
}

impl DeviceIdentity {
    /// Load the identity from `dir`, creating a fresh fingerprint on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Identity`] if the directory cannot be
    /// created or the file cannot be read/written, or
    /// [`crate::SyncError::Serialization`] if an existing file is corrupt.
    pub fn load_or_create(dir: &Path) -> SyncResult<Self> {
        let path = dir.join(DEVICE_FILE);

        if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let record: DeviceRecord = serde_json::from_str(&data)?;
            tracing::debug!(fingerprint = %record.fingerprint, "loaded device identity");
            return Ok(Self { path, record });
        }

        let record = DeviceRecord {
            fingerprint: Uuid::now_v7().to_string(),
            token: None,
            user_id: None,
            created_at: Utc::now(),
        };

        let identity = Self { path, record };
        identity.persist()?;

        tracing::info!(
            fingerprint = %identity.record.fingerprint,
            "created device identity"
        );
        Ok(identity)
    }

    /// The stable per-device fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.record.fingerprint
    }

    /// The opaque session token from the last registration, if any.
    pub fn token(&self) -> Option<&str> {
        self.record.token.as_deref()
    }

    /// Persist the session token returned by registration.
    pub fn set_token(&mut self, token: &str) -> SyncResult<()> {
        self.record.token = Some(token.to_string());
        self.persist()
    }

    /// The server-assigned user id from the last registration, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.record.user_id.as_deref()
    }

    /// Persist the server-assigned user id.
    pub fn set_user_id(&mut self, user_id: &str) -> SyncResult<()> {
        self.record.user_id = Some(user_id.to_string());
        self.persist()
    }

    /// Whether this device has completed registration.
    pub fn is_registered(&self) -> bool {
        self.record.token.is_some()
    }

    /// Write the record to disk, restricting permissions on Unix.
    fn persist(&self) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(&self.record)?;
        std::fs::write(&self.path, data)?;

        // Owner read/write only; the token is opaque but still private.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();

        let first = DeviceIdentity::load_or_create(dir.path()).unwrap();
        let second = DeviceIdentity::load_or_create(dir.path()).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn fresh_identity_is_unregistered() {
        let dir = tempfile::tempdir().unwrap();
        let identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        assert!(!identity.is_registered());
        assert_eq!(identity.token(), None);
        assert_eq!(identity.user_id(), None);
    }

    #[test]
    fn token_and_user_id_persist() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut identity = DeviceIdentity::load_or_create(dir.path()).unwrap();
            identity.set_token("mock_jwt_d-1").unwrap();
            identity.set_user_id("user-42").unwrap();
            assert!(identity.is_registered());
        }

        let reloaded = DeviceIdentity::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.token(), Some("mock_jwt_d-1"));
        assert_eq!(reloaded.user_id(), Some("user-42"));
        assert!(reloaded.is_registered());
    }

    #[test]
    fn distinct_directories_get_distinct_fingerprints() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        let a = DeviceIdentity::load_or_create(dir_a.path()).unwrap();
        let b = DeviceIdentity::load_or_create(dir_b.path()).unwrap();

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[cfg(unix)]
    #[test]
    fn identity_file_permissions_are_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let _identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        let meta = std::fs::metadata(dir.path().join("device.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}

//! Unlock flow.
//!
//! Unlocking a vault is a three-step handshake:
//!
//! 1. Register the device (email + fingerprint) with the server, receiving
//!    the server-assigned user id and an opaque session token.
//! 2. Persist the token and user id into the device identity.
//! 3. Derive the master key from the passphrase with the user id as salt.
//!
//! The resulting [`Session`] owns the key for as long as the vault stays
//! unlocked; locking is simply dropping it. The passphrase itself never
//! leaves this function and is never sent to the server.

use lexvault_core::Session;
use lexvault_core::crypto::derive_master_key;

use crate::client::{DeviceRegistry, RegisterDeviceRequest};
use crate::device::DeviceIdentity;
use crate::error::{SyncError, SyncResult};

/// Register this device and unlock the vault.
///
/// # Errors
///
/// [`SyncError::Rejected`] if the server refuses the registration,
/// [`SyncError::Remote`]/[`SyncError::Transport`] if it is unreachable, and
/// [`SyncError::Crypto`] if key derivation fails.
pub async fn unlock(
    registry: &dyn DeviceRegistry,
    identity: &mut DeviceIdentity,
    email: &str,
    passphrase: &str,
    device_name: Option<&str>,
) -> SyncResult<Session> {
    let request = RegisterDeviceRequest {
        email: email.to_string(),
        device_fingerprint: identity.fingerprint().to_string(),
        device_name: device_name.map(str::to_string),
    };

    let response = registry.register(&request).await?;

    if !response.success {
        return Err(SyncError::Rejected {
            reason: response
                .error
                .unwrap_or_else(|| "device registration failed".into()),
        });
    }

    let (Some(user_id), Some(token)) = (response.user_id, response.token) else {
        return Err(SyncError::Rejected {
            reason: "registration response is missing user id or token".into(),
        });
    };

    identity.set_token(&token)?;
    identity.set_user_id(&user_id)?;

    let master_key = derive_master_key(passphrase, &user_id)?;

    tracing::info!(
        user_id = %user_id,
        device_id = response.device_id.as_deref().unwrap_or("-"),
        "vault unlocked"
    );

    Ok(Session::new(master_key, user_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lexvault_core::crypto::{decrypt_field, derive_master_key, encrypt_field};

    use crate::client::RegisterDeviceResponse;

    /// Registry that accepts every device under a fixed account.
    struct AcceptingRegistry;

    #[async_trait]
    impl DeviceRegistry for AcceptingRegistry {
        async fn register(
            &self,
            request: &RegisterDeviceRequest,
        ) -> SyncResult<RegisterDeviceResponse> {
            assert!(!request.device_fingerprint.is_empty());
            Ok(RegisterDeviceResponse {
                success: true,
                user_id: Some("user-42".into()),
                device_id: Some("device-7".into()),
                token: Some("mock_jwt_device-7".into()),
                error: None,
            })
        }
    }

    /// Registry that refuses every registration.
    struct RefusingRegistry;

    #[async_trait]
    impl DeviceRegistry for RefusingRegistry {
        async fn register(
            &self,
            _request: &RegisterDeviceRequest,
        ) -> SyncResult<RegisterDeviceResponse> {
            Ok(RegisterDeviceResponse {
                success: false,
                user_id: None,
                device_id: None,
                token: None,
                error: Some("Email and device fingerprint are required".into()),
            })
        }
    }

    #[tokio::test]
    async fn unlock_registers_and_derives_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        let session = unlock(
            &AcceptingRegistry,
            &mut identity,
            "user@example.com",
            "correct horse battery staple",
            Some("workstation"),
        )
        .await
        .unwrap();

        assert_eq!(session.user_id(), "user-42");
        assert_eq!(identity.token(), Some("mock_jwt_device-7"));
        assert_eq!(identity.user_id(), Some("user-42"));
        assert!(identity.is_registered());
    }

    #[tokio::test]
    async fn unlock_twice_yields_interchangeable_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        let first = unlock(
            &AcceptingRegistry,
            &mut identity,
            "user@example.com",
            "correct horse battery staple",
            None,
        )
        .await
        .unwrap();

        let envelope = encrypt_field("Jane Doe", first.master_key()).unwrap();
        drop(first); // lock

        let second = unlock(
            &AcceptingRegistry,
            &mut identity,
            "user@example.com",
            "correct horse battery staple",
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            decrypt_field(&envelope, second.master_key()).unwrap(),
            "Jane Doe"
        );
    }

    #[tokio::test]
    async fn refused_registration_surfaces_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let mut identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        let result = unlock(
            &RefusingRegistry,
            &mut identity,
            "user@example.com",
            "passphrase",
            None,
        )
        .await;

        assert!(matches!(result, Err(SyncError::Rejected { .. })));
        assert!(!identity.is_registered());
    }

    #[tokio::test]
    async fn session_key_matches_direct_derivation() {
        let dir = tempfile::tempdir().unwrap();
        let mut identity = DeviceIdentity::load_or_create(dir.path()).unwrap();

        let session = unlock(
            &AcceptingRegistry,
            &mut identity,
            "user@example.com",
            "passphrase",
            None,
        )
        .await
        .unwrap();

        // Later commands re-derive offline from the persisted user id.
        let rederived = derive_master_key("passphrase", identity.user_id().unwrap()).unwrap();
        let envelope = encrypt_field("value", session.master_key()).unwrap();
        assert_eq!(decrypt_field(&envelope, &rederived).unwrap(), "value");
    }
}

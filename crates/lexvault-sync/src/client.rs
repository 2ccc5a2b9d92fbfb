//! Remote collaborators behind narrow trait seams.
//!
//! The core treats the server purely as an opaque accept/reject sink for
//! encrypted bundles plus a device-registration endpoint. Both collaborators
//! are traits so the sync agent and unlock flow can be exercised against
//! in-memory implementations; [`HttpRemote`] is the production reqwest
//! implementation.
//!
//! Wire field names are camelCase to match the server contract exactly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `POST /api/save` request body. `data` is the outer bundle envelope,
/// JSON-stringified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVaultRequest {
    pub user_id: String,
    pub owner_name: String,
    pub data: String,
}

/// `POST /api/save` response body.
///
/// `cloud_synced` reports whether the server managed a secondary
/// object-storage write before its database fallback; the client treats it
/// as informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVaultResponse {
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub cloud_synced: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/vault/{userId}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchVaultResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<String>,
}

/// A remotely stored vault payload: the outer envelope, JSON-stringified,
/// exactly as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVault {
    pub data: String,
}

/// `POST /api/auth/register-device` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub email: String,
    pub device_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// `POST /api/auth/register-device` response body. The optional fields are
/// absent when `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    pub success: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Remote persistence for encrypted vault bundles.
#[async_trait]
pub trait RemoteVault: Send + Sync {
    /// Upload a bundle. The remote is an idempotent accept/reject sink.
    async fn save(&self, request: &SaveVaultRequest) -> SyncResult<SaveVaultResponse>;

    /// Fetch the stored bundle for a user, or `None` if there is none.
    async fn fetch(&self, user_id: &str) -> SyncResult<Option<StoredVault>>;
}

/// Device/session registration.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register this device for an account, obtaining the server-assigned
    /// user id and an opaque session token.
    async fn register(&self, request: &RegisterDeviceRequest)
    -> SyncResult<RegisterDeviceResponse>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed implementation of both remote collaborators.
pub struct HttpRemote {
    base: Url,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a client for the server at `base`.
    pub fn new(base: Url) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("LexVault/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { base, client }
    }

    /// The server this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl RemoteVault for HttpRemote {
    async fn save(&self, request: &SaveVaultRequest) -> SyncResult<SaveVaultResponse> {
        let url = self.base.join("api/save")?;
        tracing::debug!(url = %url, user_id = %request.user_id, "uploading vault bundle");

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            // The server reports structured rejections with a JSON body;
            // surface whatever it said.
            let reason = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                reason,
            });
        }

        let body: SaveVaultResponse = response.json().await?;
        tracing::debug!(
            id = body.id.as_deref().unwrap_or("-"),
            cloud_synced = body.cloud_synced,
            "vault bundle accepted"
        );
        Ok(body)
    }

    async fn fetch(&self, user_id: &str) -> SyncResult<Option<StoredVault>> {
        let url = self.base.join(&format!("api/vault/{user_id}"))?;
        tracing::debug!(url = %url, "fetching remote vault");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                reason,
            });
        }

        let body: FetchVaultResponse = response.json().await?;
        Ok(body.data.map(|data| StoredVault { data }))
    }
}

#[async_trait]
impl DeviceRegistry for HttpRemote {
    async fn register(
        &self,
        request: &RegisterDeviceRequest,
    ) -> SyncResult<RegisterDeviceResponse> {
        let url = self.base.join("api/auth/register-device")?;
        tracing::debug!(url = %url, email = %request.email, "registering device");

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Sync error types.
//!
//! Remote failures (unreachable server, rejected requests) are recoverable:
//! the local store stays authoritative and the caller may retry later.
//! Cryptographic failures pass through transparently from the core crate —
//! they are fatal for the bundle involved and must never be degraded into a
//! retryable result.

use thiserror::Error;

/// Alias for `Result<T, SyncError>`.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the remote store or managing the
/// device identity.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote store answered with a non-success status.
    #[error("remote store rejected the request: status={status}, {reason}")]
    Remote { status: u16, reason: String },

    /// Device registration was refused by the server.
    #[error("device registration rejected: {reason}")]
    Rejected { reason: String },

    /// The HTTP transport failed (connect, timeout, malformed response).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured server URL cannot be joined with an endpoint path.
    #[error("invalid remote url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No remote vault exists for this user.
    #[error("no remote vault found for user `{user_id}`")]
    NotFound { user_id: String },

    /// A cryptographic operation failed. Fatal for the bundle involved.
    #[error(transparent)]
    Crypto(#[from] lexvault_core::VaultError),

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] lexvault_store::StoreError),

    /// JSON serialization or deserialization of a payload failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the device identity file failed.
    #[error("device identity io error: {0}")]
    Identity(#[from] std::io::Error),
}

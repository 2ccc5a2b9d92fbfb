//! Store error types.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`]. Crypto
//! failures from the core crate pass through transparently so callers can
//! still match on [`lexvault_core::VaultError::DecryptionFailed`].

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the local vault store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization or deserialization of a stored entry failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cryptographic operation failed while encrypting or decrypting an
    /// entry.
    #[error(transparent)]
    Crypto(#[from] lexvault_core::VaultError),

    /// Database schema migration failed.
    #[error("migration failed: {reason}")]
    MigrationFailed { reason: String },

    /// A bulk write failed part-way through. There is no rollback across
    /// fields; `written` lists the fields that were updated before
    /// `failed_field` errored, so the caller can retry only the remainder.
    #[error("partial write: {written:?} updated before `{failed_field}` failed: {reason}")]
    PartialWrite {
        written: Vec<String>,
        failed_field: String,
        reason: String,
    },

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

//! Unlocked vault sessions.
//!
//! A [`Session`] pairs the in-memory master key with the account it was
//! derived for. It is created by the unlock flow, passed explicitly to vault
//! operations, and destroyed by dropping it (locking) — the key material is
//! zeroized when the [`MasterKey`] drops. Sessions are never serialized or
//! persisted.
//!
//! The session's lifetime is owned by whatever orchestrates unlock/lock (the
//! CLI, a UI shell), not by the crypto or storage components. A lock does
//! not abort operations already in flight; results obtained after the lock
//! are stale and must be discarded by the caller.

use crate::crypto::MasterKey;

/// An unlocked vault: the derived master key plus the owning account id.
#[derive(Debug)]
pub struct Session {
    master_key: MasterKey,
    user_id: String,
}

impl Session {
    /// Create a session from a freshly derived key.
    pub fn new(master_key: MasterKey, user_id: impl Into<String>) -> Self {
        Self {
            master_key,
            user_id: user_id.into(),
        }
    }

    /// The master key for this session.
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// The server-assigned user id the key was derived for.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

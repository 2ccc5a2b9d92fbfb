//! Stored entry model.
//!
//! One [`VaultEntry`] per field name. The variant is an explicit serde tag
//! (`"kind"`), never inferred from the presence of `ciphertext`/`iv` keys,
//! so a plaintext value that happens to look like an envelope can never be
//! misread as one.

use lexvault_core::EncryptedField;
use serde::{Deserialize, Serialize};

/// A single stored field: plaintext for public fields, an encrypted envelope
/// for sensitive ones.
///
/// Serializes as `{"kind":"plain","value":...}` or
/// `{"kind":"encrypted","ciphertext":...,"iv":...}`. This tagged form is
/// also the shape each entry takes inside a backup bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEntry {
    /// Public field stored as-is.
    Plain { value: String },
    /// Sensitive field stored as an AES-256-GCM envelope.
    Encrypted { ciphertext: String, iv: String },
}

impl VaultEntry {
    /// True when this entry holds an encrypted envelope.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted { .. })
    }

    /// View an `Encrypted` entry as a core [`EncryptedField`].
    pub fn as_envelope(&self) -> Option<EncryptedField> {
        match self {
            Self::Plain { .. } => None,
            Self::Encrypted { ciphertext, iv } => Some(EncryptedField {
                ciphertext: ciphertext.clone(),
                iv: iv.clone(),
            }),
        }
    }
}

impl From<EncryptedField> for VaultEntry {
    fn from(envelope: EncryptedField) -> Self {
        Self::Encrypted {
            ciphertext: envelope.ciphertext,
            iv: envelope.iv,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_entry_wire_shape() {
        let entry = VaultEntry::Plain {
            value: "Acme Corp".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"kind":"plain","value":"Acme Corp"}"#);
    }

    #[test]
    fn encrypted_entry_wire_shape() {
        let entry = VaultEntry::Encrypted {
            ciphertext: "Y2lwaGVy".into(),
            iv: "aXY=".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"encrypted","ciphertext":"Y2lwaGVy","iv":"aXY="}"#
        );

        let back: VaultEntry = serde_json::from_str(&json).unwrap();
        assert!(back.is_encrypted());
        assert_eq!(back.as_envelope().unwrap().iv, "aXY=");
    }

    #[test]
    fn plaintext_resembling_an_envelope_stays_plain() {
        // Structural sniffing would misread this value; the tag does not.
        let entry = VaultEntry::Plain {
            value: r#"{"ciphertext":"x","iv":"y"}"#.into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: VaultEntry = serde_json::from_str(&json).unwrap();
        assert!(!back.is_encrypted());
        assert!(back.as_envelope().is_none());
    }

    #[test]
    fn entry_without_kind_tag_is_rejected() {
        let result = serde_json::from_str::<VaultEntry>(r#"{"ciphertext":"x","iv":"y"}"#);
        assert!(result.is_err());
    }
}

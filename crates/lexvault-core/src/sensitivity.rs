//! Field sensitivity policy.
//!
//! Every vault write is gated by a static classification: `Sensitive` fields
//! are encrypted at rest, `Public` fields are stored as plaintext metadata.
//! Classification is a pure function of the field name backed by a registry;
//! names absent from the registry default to [`Sensitivity::Public`].
//!
//! The permissive default is deliberate and preserved from the original
//! policy: callers that add new sensitive fields must register them
//! explicitly via [`SensitivityRegistry::insert`] — there is no runtime
//! inference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Whether a field is stored encrypted or as plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    /// Not encrypted (metadata).
    Public,
    /// Encrypted at rest (PII, legal data).
    Sensitive,
}

/// Built-in classification table: identity metadata is public, legal and
/// financial data is sensitive.
const BUILTIN_FIELDS: &[(&str, Sensitivity)] = &[
    // Identity
    ("owner_name", Sensitivity::Public),
    ("email", Sensitivity::Public),
    // Legal data
    ("ssn", Sensitivity::Sensitive),
    ("tax_id", Sensitivity::Sensitive),
    ("address", Sensitivity::Sensitive),
    ("phone_number", Sensitivity::Sensitive),
    ("bank_account", Sensitivity::Sensitive),
    // Independent contractor agreement fields
    ("contractor_name", Sensitivity::Sensitive),
    ("contractor_address", Sensitivity::Sensitive),
    ("client_name", Sensitivity::Sensitive),
    ("compensation", Sensitivity::Sensitive),
];

/// Registry mapping field names to their [`Sensitivity`].
///
/// [`SensitivityRegistry::default`] loads the built-in table. Extending the
/// registry is the supported way to change policy for new fields.
#[derive(Debug, Clone)]
pub struct SensitivityRegistry {
    fields: HashMap<String, Sensitivity>,
}

impl Default for SensitivityRegistry {
    fn default() -> Self {
        let fields = BUILTIN_FIELDS
            .iter()
            .map(|(name, tag)| (name.to_string(), *tag))
            .collect();
        Self { fields }
    }
}

impl SensitivityRegistry {
    /// An empty registry: every field classifies as [`Sensitivity::Public`].
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Register (or override) the classification for a field name.
    pub fn insert(&mut self, field: impl Into<String>, tag: Sensitivity) {
        self.fields.insert(field.into(), tag);
    }

    /// Classify a field name. Total: unknown names are `Public`.
    pub fn classify(&self, field: &str) -> Sensitivity {
        self.fields
            .get(field)
            .copied()
            .unwrap_or(Sensitivity::Public)
    }

    /// Shorthand for `classify(field) == Sensitivity::Sensitive`.
    pub fn is_sensitive(&self, field: &str) -> bool {
        self.classify(field) == Sensitivity::Sensitive
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

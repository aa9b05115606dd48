//! Parsed secret references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A secret reference parsed by the active provider.
///
/// The broker treats only the vault as semantically meaningful (open/gated
/// classification is case-insensitive on the vault name); item and field are
/// opaque strings used for audit records and standing-approval matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    /// Top-level grouping ("vault"), the unit of classification.
    pub vault: String,
    /// Item name within the vault.
    pub item: String,
    /// Field name within the item.
    pub field: String,
    /// The original, unparsed reference string.
    pub raw: String,
}

impl SecretRef {
    /// Create a new reference from its parsed parts and the original string.
    #[must_use]
    pub fn new(
        vault: impl Into<String>,
        item: impl Into<String>,
        field: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            vault: vault.into(),
            item: item.into(),
            field: field.into(),
            raw: raw.into(),
        }
    }

    /// The vault name folded for case-insensitive classification.
    #[must_use]
    pub fn vault_key(&self) -> String {
        self.vault.to_lowercase()
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

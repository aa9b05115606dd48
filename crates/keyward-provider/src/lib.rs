//! Secret provider contract for the Keyward approval broker.
//!
//! A provider parses opaque secret references into a
//! [`SecretRef`](keyward_core::SecretRef) triple and fetches values from a
//! backend. Exactly one provider is active per broker instance, selected by
//! name at startup via [`build_provider`]; there is no runtime registration
//! of new backends.
//!
//! The `elevated` flag on [`SecretProvider::fetch`] is set for all gated
//! reads and signals the provider to use a separately-stored credential, so
//! the high-privilege token can be filesystem-isolated from the requesting
//! caller.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod op;

pub use error::{ProviderError, ProviderResult};
pub use op::OpProvider;

use async_trait::async_trait;
use keyward_config::ProviderSection;
use keyward_core::SecretRef;
use std::sync::Arc;

/// Uniform reference-parse + fetch contract over arbitrary secret backends.
///
/// Providers are stateless across calls from the broker's perspective.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// The provider's registry name.
    fn name(&self) -> &str;

    /// Parse an opaque reference string, or `None` if unrecognised.
    fn parse_reference(&self, reference: &str) -> Option<SecretRef>;

    /// Fetch the value behind a reference.
    ///
    /// `elevated` selects the separately-stored high-privilege credential
    /// and is set for all gated reads.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the backend cannot produce a value.
    async fn fetch(&self, secret: &SecretRef, elevated: bool) -> ProviderResult<String>;

    /// Check that the provider is usable. Called once at startup; a failure
    /// is fatal to the daemon.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] describing why the provider is unusable.
    async fn validate(&self) -> ProviderResult<()>;
}

/// Construct the configured provider by name.
///
/// # Errors
///
/// Returns [`ProviderError::UnknownProvider`] for names the registry does
/// not know.
pub fn build_provider(config: &ProviderSection) -> ProviderResult<Arc<dyn SecretProvider>> {
    match config.name.as_str() {
        "op" => Ok(Arc::new(OpProvider::new(&config.op))),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_known_provider() {
        let section = ProviderSection::default();
        let provider = build_provider(&section).unwrap();
        assert_eq!(provider.name(), "op");
    }

    #[test]
    fn test_build_unknown_provider() {
        let section = ProviderSection {
            name: "vaultd".to_owned(),
            ..ProviderSection::default()
        };
        let err = match build_provider(&section) {
            Err(e) => e,
            Ok(_) => panic!("expected build_provider to fail for unknown provider"),
        };
        assert!(err.to_string().contains("vaultd"));
    }
}

//! The 1Password CLI provider.
//!
//! References have the shape `op://<vault>/<item>/<field>`. Fetching spawns
//! `op read <reference>` with `OP_SERVICE_ACCOUNT_TOKEN` taken from a token
//! file; gated (elevated) reads use a separate token file so the
//! high-privilege credential never has to be readable by the caller.

use async_trait::async_trait;
use keyward_core::SecretRef;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::SecretProvider;

/// Reference scheme accepted by this provider.
const SCHEME: &str = "op://";

/// Environment variable the `op` CLI reads its service-account token from.
const TOKEN_ENV: &str = "OP_SERVICE_ACCOUNT_TOKEN";

/// Secret provider backed by the 1Password CLI.
pub struct OpProvider {
    binary: PathBuf,
    token_file: Option<PathBuf>,
    elevated_token_file: Option<PathBuf>,
}

impl OpProvider {
    /// Create a provider from its config section.
    #[must_use]
    pub fn new(config: &keyward_config::OpProviderConfig) -> Self {
        Self {
            binary: config.op_binary.clone(),
            token_file: config.token_file.clone(),
            elevated_token_file: config.elevated_token_file.clone(),
        }
    }

    /// Resolve the token for a fetch, preferring the elevated file for
    /// elevated reads. `None` means the ambient environment is used as-is.
    fn read_token(&self, elevated: bool) -> ProviderResult<Option<String>> {
        let file = if elevated {
            self.elevated_token_file
                .as_deref()
                .or(self.token_file.as_deref())
        } else {
            self.token_file.as_deref()
        };
        match file {
            Some(path) => read_trimmed(path).map(Some),
            None => Ok(None),
        }
    }
}

fn read_trimmed(path: &Path) -> ProviderResult<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| ProviderError::Credential(format!("cannot read {}: {e}", path.display())))
}

#[async_trait]
impl SecretProvider for OpProvider {
    fn name(&self) -> &str {
        "op"
    }

    fn parse_reference(&self, reference: &str) -> Option<SecretRef> {
        let rest = reference.strip_prefix(SCHEME)?;
        let mut parts = rest.splitn(3, '/');
        let vault = parts.next().filter(|s| !s.is_empty())?;
        let item = parts.next().filter(|s| !s.is_empty())?;
        let field = parts.next().filter(|s| !s.is_empty())?;
        Some(SecretRef::new(vault, item, field, reference))
    }

    async fn fetch(&self, secret: &SecretRef, elevated: bool) -> ProviderResult<String> {
        let token = self.read_token(elevated)?;
        debug!(reference = %secret, elevated, "invoking op read");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("read")
            .arg("--no-newline")
            .arg(&secret.raw)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(token) = token {
            cmd.env(TOKEN_ENV, token);
        }

        let output = cmd.output().await.map_err(|e| {
            ProviderError::Fetch(format!("failed to run {}: {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Fetch(stderr.trim().to_string()));
        }

        let value = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        Ok(value)
    }

    async fn validate(&self) -> ProviderResult<()> {
        for path in [self.token_file.as_deref(), self.elevated_token_file.as_deref()]
            .into_iter()
            .flatten()
        {
            if std::fs::metadata(path).is_err() {
                return Err(ProviderError::Validation(format!(
                    "token file {} is not readable",
                    path.display()
                )));
            }
        }

        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ProviderError::Validation(format!(
                    "op binary {} is not runnable: {e}",
                    self.binary.display()
                ))
            })?;
        if !output.status.success() {
            return Err(ProviderError::Validation(format!(
                "op binary {} exited with {}",
                self.binary.display(),
                output.status
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpProvider")
            .field("binary", &self.binary)
            .field("has_token_file", &self.token_file.is_some())
            .field("has_elevated_token_file", &self.elevated_token_file.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_config::OpProviderConfig;

    fn provider() -> OpProvider {
        OpProvider::new(&OpProviderConfig::default())
    }

    // -----------------------------------------------------------------------
    // Reference parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_full_reference() {
        let secret = provider().parse_reference("op://Prod/stripe/api-key").unwrap();
        assert_eq!(secret.vault, "Prod");
        assert_eq!(secret.item, "stripe");
        assert_eq!(secret.field, "api-key");
        assert_eq!(secret.raw, "op://Prod/stripe/api-key");
    }

    #[test]
    fn test_field_keeps_embedded_slashes() {
        let secret = provider()
            .parse_reference("op://v/item/section/field")
            .unwrap();
        assert_eq!(secret.field, "section/field");
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        assert!(provider().parse_reference("vault://a/b/c").is_none());
        assert!(provider().parse_reference("not a uri").is_none());
    }

    #[test]
    fn test_rejects_missing_segments() {
        assert!(provider().parse_reference("op://onlyvault").is_none());
        assert!(provider().parse_reference("op://vault/item").is_none());
        assert!(provider().parse_reference("op:///item/field").is_none());
        assert!(provider().parse_reference("op://vault//field").is_none());
    }

    // -----------------------------------------------------------------------
    // Token resolution
    // -----------------------------------------------------------------------

    #[test]
    fn test_elevated_prefers_elevated_token_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let low = dir.path().join("low.token");
        let high = dir.path().join("high.token");
        std::fs::write(&low, "low-token\n").unwrap();
        std::fs::write(&high, "high-token\n").unwrap();

        let provider = OpProvider::new(&OpProviderConfig {
            op_binary: PathBuf::from("op"),
            token_file: Some(low),
            elevated_token_file: Some(high),
        });

        assert_eq!(
            provider.read_token(false).unwrap().as_deref(),
            Some("low-token")
        );
        assert_eq!(
            provider.read_token(true).unwrap().as_deref(),
            Some("high-token")
        );
    }

    #[test]
    fn test_missing_token_file_is_a_credential_error() {
        let provider = OpProvider::new(&OpProviderConfig {
            op_binary: PathBuf::from("op"),
            token_file: Some(PathBuf::from("/nonexistent/keyward-token")),
            elevated_token_file: None,
        });
        assert!(matches!(
            provider.read_token(false),
            Err(ProviderError::Credential(_))
        ));
    }
}

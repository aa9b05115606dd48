//! Configuration struct definitions.
//!
//! Every section defaults to a usable local-development value so that a
//! minimal config file only has to name the vaults and the channel
//! credentials.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the broker daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Filesystem path the request transport binds to.
    pub socket_path: PathBuf,
    /// Loopback port for the HTTP callback listener.
    pub http_port: u16,
    /// PID file path (best-effort).
    pub pid_file: PathBuf,
    /// Audit log path (JSONL, append-only).
    pub audit_log: PathBuf,
    /// Drop directory watched for `<id>.json` callback files.
    pub pending_dir: PathBuf,
    /// Value-cache TTL in milliseconds. Zero or negative disables caching.
    pub cache_ttl_ms: i64,
    /// Approval timeout in milliseconds (minimum 10000).
    pub approval_timeout_ms: u64,
    /// Open / gated vault lists.
    pub vaults: VaultsSection,
    /// Standing-approval rules, evaluated in order.
    pub standing_approvals: Vec<StandingRule>,
    /// Secret provider selection and settings.
    pub provider: ProviderSection,
    /// Notification channel settings.
    pub channels: ChannelsSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/keyward/keyward.sock"),
            http_port: 8373,
            pid_file: PathBuf::from("/tmp/keyward/keyward.pid"),
            audit_log: PathBuf::from("/tmp/keyward/audit.jsonl"),
            pending_dir: PathBuf::from("/tmp/keyward/pending"),
            cache_ttl_ms: 300_000,
            approval_timeout_ms: 120_000,
            vaults: VaultsSection::default(),
            standing_approvals: Vec::new(),
            provider: ProviderSection::default(),
            channels: ChannelsSection::default(),
        }
    }
}

/// Vault classification lists. Matching is case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultsSection {
    /// Vaults whose secrets are returned without approval.
    pub open: Vec<String>,
    /// Vaults whose secrets require out-of-band approval.
    pub gated: Vec<String>,
}

impl VaultsSection {
    /// True when neither list names a vault.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.gated.is_empty()
    }
}

/// One standing-approval rule.
///
/// `reason_match` is an exact match unless it ends with a single trailing
/// `*`, in which case it is a prefix match against the caller's reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandingRule {
    /// Item name the rule applies to (exact).
    pub item: String,
    /// Reason pattern.
    pub reason_match: String,
    /// Free-form note carried into the audit record.
    #[serde(default)]
    pub note: String,
}

/// Provider selection plus per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSection {
    /// Provider name (currently only `"op"`).
    pub name: String,
    /// Settings for the 1Password CLI provider.
    pub op: OpProviderConfig,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            name: "op".to_owned(),
            op: OpProviderConfig::default(),
        }
    }
}

/// Settings for the 1Password CLI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpProviderConfig {
    /// Path of the `op` binary.
    pub op_binary: PathBuf,
    /// Service-account token file for ordinary (open) reads.
    pub token_file: Option<PathBuf>,
    /// Separately-stored token file used for all gated reads, enabling
    /// filesystem isolation of the high-privilege credential.
    pub elevated_token_file: Option<PathBuf>,
}

impl Default for OpProviderConfig {
    fn default() -> Self {
        Self {
            op_binary: PathBuf::from("op"),
            token_file: None,
            elevated_token_file: None,
        }
    }
}

/// Notification channel configuration, one optional section per channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelsSection {
    /// Telegram bot channel.
    pub telegram: Option<TelegramChannelConfig>,
    /// Generic webhook channel.
    pub webhook: Option<WebhookChannelConfig>,
}

impl ChannelsSection {
    /// True when no channel is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.telegram.is_none() && self.webhook.is_none()
    }

    /// Names of the configured channels, in a stable order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.telegram.is_some() {
            names.push("telegram".to_owned());
        }
        if self.webhook.is_some() {
            names.push("webhook".to_owned());
        }
        names
    }
}

/// Telegram bot channel settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramChannelConfig {
    /// Bot API token.
    pub bot_token: String,
    /// Chat to send approval prompts to.
    pub chat_id: i64,
}

impl std::fmt::Debug for TelegramChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannelConfig")
            .field("has_bot_token", &!self.bot_token.is_empty())
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Generic webhook channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookChannelConfig {
    /// URL to POST prompts and outcomes to.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.http_port, 8373);
        assert!(config.approval_timeout_ms >= 10_000);
        assert!(config.vaults.is_empty());
        assert!(config.channels.is_empty());
        assert_eq!(config.provider.name, "op");
    }

    #[test]
    fn test_minimal_toml_parses() {
        let config: Config = toml::from_str(
            r#"
            [vaults]
            open = ["pub"]
            gated = ["sec"]

            [channels.telegram]
            bot_token = "123:abc"
            chat_id = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.vaults.open, vec!["pub"]);
        assert_eq!(config.vaults.gated, vec!["sec"]);
        assert_eq!(config.channels.names(), vec!["telegram"]);
    }

    #[test]
    fn test_standing_rules_parse_in_order() {
        let config: Config = toml::from_str(
            r#"
            [vaults]
            open = ["pub"]

            [[standing_approvals]]
            item = "cron-key"
            reason_match = "cron:*"
            note = "nightly jobs"

            [[standing_approvals]]
            item = "ci-token"
            reason_match = "ci"
            "#,
        )
        .unwrap();
        assert_eq!(config.standing_approvals.len(), 2);
        assert_eq!(config.standing_approvals[0].item, "cron-key");
        assert_eq!(config.standing_approvals[1].note, "");
    }

    #[test]
    fn test_telegram_debug_redacts_token() {
        let section = TelegramChannelConfig {
            bot_token: "very-secret".to_owned(),
            chat_id: 7,
        };
        let debug = format!("{section:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("has_bot_token"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = toml::from_str::<Config>("socket_pth = \"/tmp/x\"\n");
        assert!(result.is_err());
    }
}

//! Post-parse configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Lower bound on the approval timeout.
const MIN_APPROVAL_TIMEOUT_MS: u64 = 10_000;

/// Validate a fully-parsed configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::Validation`] encountered.
pub(crate) fn validate(config: &Config) -> ConfigResult<()> {
    if config.vaults.is_empty() {
        return Err(ConfigError::Validation {
            field: "vaults".to_owned(),
            message: "at least one open or gated vault must be configured".to_owned(),
        });
    }

    if !config.vaults.gated.is_empty() && config.channels.is_empty() {
        return Err(ConfigError::Validation {
            field: "channels".to_owned(),
            message: "gated vaults are configured but no notification channel is".to_owned(),
        });
    }

    for (i, rule) in config.standing_approvals.iter().enumerate() {
        if rule.item.is_empty() {
            return Err(ConfigError::Validation {
                field: format!("standing_approvals[{i}].item"),
                message: "item must not be empty".to_owned(),
            });
        }
        if rule.reason_match.is_empty() {
            return Err(ConfigError::Validation {
                field: format!("standing_approvals[{i}].reason_match"),
                message: "reason_match must not be empty".to_owned(),
            });
        }
    }

    if config.approval_timeout_ms < MIN_APPROVAL_TIMEOUT_MS {
        return Err(ConfigError::Validation {
            field: "approval_timeout_ms".to_owned(),
            message: format!(
                "approval timeout {}ms is below the minimum of {MIN_APPROVAL_TIMEOUT_MS}ms",
                config.approval_timeout_ms
            ),
        });
    }

    if config.http_port == 0 {
        return Err(ConfigError::Validation {
            field: "http_port".to_owned(),
            message: "http_port must be non-zero".to_owned(),
        });
    }

    if config.provider.name.is_empty() {
        return Err(ConfigError::Validation {
            field: "provider.name".to_owned(),
            message: "provider name must not be empty".to_owned(),
        });
    }

    Ok(())
}

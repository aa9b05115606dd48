//! Request orchestrator.
//!
//! Classifies each `read`, consults standing rules and the cache, fans
//! approval prompts out to the configured channels, suspends on the pending
//! registry, and turns the resolution into a fetch (or an error), writing
//! audit events at every decision point.
//!
//! The orchestrator never panics out of a request: every path terminates in
//! either a value or an error string for the transport to return.

use keyward_audit::{AuditEvent, AuditSink, ReadResult};
use keyward_channel::{ApprovalPrompt, MessageHandle, NotifyChannel};
use keyward_config::Config;
use keyward_core::{RequestId, SecretRef};
use keyward_provider::SecretProvider;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cache::ValueCache;
use crate::registry::{PendingRegistry, Resolution};
use crate::standing::StandingRules;

/// The approval broker engine.
pub struct Broker {
    provider: Arc<dyn SecretProvider>,
    channels: Vec<Arc<dyn NotifyChannel>>,
    open_vaults: HashSet<String>,
    gated_vaults: HashSet<String>,
    standing: StandingRules,
    cache: ValueCache,
    registry: Arc<PendingRegistry>,
    audit: Arc<AuditSink>,
    approval_timeout: Duration,
    started_at: Instant,
}

impl Broker {
    /// Assemble a broker from its configured parts.
    #[must_use]
    pub fn new(
        config: &Config,
        provider: Arc<dyn SecretProvider>,
        channels: Vec<Arc<dyn NotifyChannel>>,
        audit: Arc<AuditSink>,
    ) -> Arc<Self> {
        let fold = |names: &[String]| -> HashSet<String> {
            names.iter().map(|v| v.to_lowercase()).collect()
        };
        Arc::new(Self {
            provider,
            channels,
            open_vaults: fold(&config.vaults.open),
            gated_vaults: fold(&config.vaults.gated),
            standing: StandingRules::new(config.standing_approvals.clone()),
            cache: ValueCache::new(config.cache_ttl_ms),
            registry: PendingRegistry::new(),
            audit,
            approval_timeout: Duration::from_millis(config.approval_timeout_ms),
            started_at: Instant::now(),
        })
    }

    /// The pending registry, shared with the callback ingresses.
    #[must_use]
    pub fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    /// Number of outstanding approvals.
    pub async fn pending_count(&self) -> usize {
        self.registry.count().await
    }

    /// Number of cached values.
    pub async fn cache_size(&self) -> usize {
        self.cache.len().await
    }

    /// Active provider name.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Active channel names.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_owned()).collect()
    }

    /// Seconds since the broker came up.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Handle a `read` request: return the secret value or an error
    /// message for the caller.
    pub async fn handle_read(&self, uri: &str, reason: Option<&str>) -> Result<String, String> {
        let Some(secret) = self.provider.parse_reference(uri) else {
            return Err("Invalid URI".to_string());
        };

        let vault_key = secret.vault_key();
        if self.open_vaults.contains(&vault_key) {
            return self.read_open(&secret, reason).await;
        }
        if self.gated_vaults.contains(&vault_key) {
            return self.read_gated(&secret, reason).await;
        }
        Err(format!(
            "Vault '{}' is not configured as open or gated",
            secret.vault
        ))
    }

    /// Open vault: audit, fetch without elevation, return.
    async fn read_open(&self, secret: &SecretRef, reason: Option<&str>) -> Result<String, String> {
        self.audit.append(&AuditEvent::Read {
            result: ReadResult::Allowed,
            uri: secret.raw.clone(),
            vault: secret.vault.clone(),
            item: secret.item.clone(),
            reason: reason.map(str::to_string),
            request_id: None,
            rule_note: None,
        });
        match self.provider.fetch(secret, false).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.audit.append(&AuditEvent::ReadError {
                    uri: secret.raw.clone(),
                    error: e.to_string(),
                    request_id: None,
                });
                Err(e.to_string())
            }
        }
    }

    /// Gated vault: standing rules, cache, then the full approval path.
    async fn read_gated(&self, secret: &SecretRef, reason: Option<&str>) -> Result<String, String> {
        let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
            // Never reached approval consideration; nothing to audit.
            return Err(format!(
                "Reason is REQUIRED for reads from gated vault '{}'",
                secret.vault
            ));
        };

        if let Some(rule) = self.standing.find_match(&secret.item, reason) {
            let rule_note = Some(rule.note.clone()).filter(|n| !n.is_empty());
            self.audit.append(&AuditEvent::Read {
                result: ReadResult::StandingApproval,
                uri: secret.raw.clone(),
                vault: secret.vault.clone(),
                item: secret.item.clone(),
                reason: Some(reason.to_string()),
                request_id: None,
                rule_note: rule_note.clone(),
            });
            return match self.provider.fetch(secret, true).await {
                Ok(value) => {
                    self.audit.append(&AuditEvent::Read {
                        result: ReadResult::StandingApprovedRead,
                        uri: secret.raw.clone(),
                        vault: secret.vault.clone(),
                        item: secret.item.clone(),
                        reason: Some(reason.to_string()),
                        request_id: None,
                        rule_note,
                    });
                    Ok(value)
                }
                Err(e) => {
                    self.audit.append(&AuditEvent::ReadError {
                        uri: secret.raw.clone(),
                        error: e.to_string(),
                        request_id: None,
                    });
                    Err(e.to_string())
                }
            };
        }

        if let Some(value) = self.cache.lookup(&secret.raw).await {
            self.audit.append(&AuditEvent::Read {
                result: ReadResult::CacheHit,
                uri: secret.raw.clone(),
                vault: secret.vault.clone(),
                item: secret.item.clone(),
                reason: Some(reason.to_string()),
                request_id: None,
                rule_note: None,
            });
            return Ok(value);
        }

        self.approve_and_fetch(secret, reason).await
    }

    /// The approval path: prompt, suspend, resolve, fetch.
    async fn approve_and_fetch(&self, secret: &SecretRef, reason: &str) -> Result<String, String> {
        let id = RequestId::new();
        self.audit.append(&AuditEvent::Request {
            result: ReadResult::Pending,
            id: id.to_string(),
            uri: secret.raw.clone(),
            reason: reason.to_string(),
        });
        info!(id = %id, uri = %secret, "approval requested");

        let prompt = ApprovalPrompt {
            request_id: id,
            vault: secret.vault.clone(),
            item: secret.item.clone(),
            field: secret.field.clone(),
            reason: reason.to_string(),
        };

        let mut handles: Vec<(Arc<dyn NotifyChannel>, MessageHandle)> = Vec::new();
        for channel in &self.channels {
            match channel.send_prompt(&prompt).await {
                Ok(handle) => handles.push((Arc::clone(channel), handle)),
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "approval prompt failed");
                    self.audit.append(&AuditEvent::ChannelError {
                        channel: channel.name().to_owned(),
                        error: e.to_string(),
                        id: Some(id.to_string()),
                    });
                }
            }
        }
        if !self.channels.is_empty() && handles.is_empty() {
            return Err("Failed to send approval request to any channel".to_string());
        }

        let rx = self.registry.register(id, self.approval_timeout).await;
        // Suspend until a callback, the drop directory, the timer, or
        // shutdown resolves the entry. A dropped sender cannot happen while
        // the entry is in the map, but treat it as a denial if it does.
        let resolution = rx.await.unwrap_or(Resolution::Denied);

        match resolution {
            Resolution::Approved => {
                self.audit.append(&AuditEvent::Approved {
                    id: id.to_string(),
                    uri: secret.raw.clone(),
                });
                self.update_outcomes(&handles, true, &prompt).await;
                match self.provider.fetch(secret, true).await {
                    Ok(value) => {
                        self.cache.store(&secret.raw, &value).await;
                        self.audit.append(&AuditEvent::Read {
                            result: ReadResult::ApprovedRead,
                            uri: secret.raw.clone(),
                            vault: secret.vault.clone(),
                            item: secret.item.clone(),
                            reason: Some(reason.to_string()),
                            request_id: Some(id.to_string()),
                            rule_note: None,
                        });
                        Ok(value)
                    }
                    Err(e) => {
                        self.audit.append(&AuditEvent::ReadError {
                            uri: secret.raw.clone(),
                            error: e.to_string(),
                            request_id: Some(id.to_string()),
                        });
                        Err(e.to_string())
                    }
                }
            }
            Resolution::Denied => {
                self.audit.append(&AuditEvent::Denied {
                    id: id.to_string(),
                    uri: secret.raw.clone(),
                });
                self.update_outcomes(&handles, false, &prompt).await;
                Err("Request denied by operator".to_string())
            }
            Resolution::Shutdown => {
                // Denied without notifying channels.
                self.audit.append(&AuditEvent::Denied {
                    id: id.to_string(),
                    uri: secret.raw.clone(),
                });
                Err("Request denied by operator".to_string())
            }
            Resolution::TimedOut => {
                self.update_outcomes(&handles, false, &prompt).await;
                let timeout_ms = u64::try_from(self.approval_timeout.as_millis())
                    .unwrap_or(u64::MAX);
                self.audit.append(&AuditEvent::Timeout {
                    id: id.to_string(),
                    uri: secret.raw.clone(),
                    timeout_ms,
                });
                Err(format!("Approval request timed out after {timeout_ms}ms"))
            }
        }
    }

    /// Best-effort outcome fan-out; each handle is consumed exactly once.
    async fn update_outcomes(
        &self,
        handles: &[(Arc<dyn NotifyChannel>, MessageHandle)],
        approved: bool,
        prompt: &ApprovalPrompt,
    ) {
        for (channel, handle) in handles {
            if let Err(e) = channel.update_outcome(handle, approved, prompt).await {
                warn!(channel = channel.name(), error = %e, "outcome update failed");
            }
        }
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("provider", &self.provider.name())
            .field("channels", &self.channel_names())
            .field("open_vaults", &self.open_vaults)
            .field("gated_vaults", &self.gated_vaults)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keyward_provider::{ProviderError, ProviderResult};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Provider returning `"v"` for any `op://` reference, recording the
    /// elevation flag of each fetch.
    struct StaticProvider {
        elevations: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl SecretProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn parse_reference(&self, reference: &str) -> Option<SecretRef> {
            let rest = reference.strip_prefix("op://")?;
            let mut parts = rest.splitn(3, '/');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(vault), Some(item), Some(field)) => {
                    Some(SecretRef::new(vault, item, field, reference))
                }
                _ => None,
            }
        }

        async fn fetch(&self, _secret: &SecretRef, elevated: bool) -> ProviderResult<String> {
            self.elevations.lock().expect("lock").push(elevated);
            Ok("v".to_string())
        }

        async fn validate(&self) -> ProviderResult<()> {
            Ok(())
        }
    }

    /// Provider whose fetch always fails.
    struct BrokenProvider;

    #[async_trait]
    impl SecretProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn parse_reference(&self, reference: &str) -> Option<SecretRef> {
            Some(SecretRef::new("pub", "k", "f", reference))
        }

        async fn fetch(&self, _secret: &SecretRef, _elevated: bool) -> ProviderResult<String> {
            Err(ProviderError::Fetch("backend down".to_string()))
        }

        async fn validate(&self) -> ProviderResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        audit_path: std::path::PathBuf,
        broker: Arc<Broker>,
    }

    fn fixture(provider: Arc<dyn SecretProvider>) -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let audit_path = dir.path().join("audit.jsonl");
        let mut config = Config::default();
        config.vaults.open = vec!["pub".to_string()];
        config.vaults.gated = vec!["sec".to_string()];
        let audit = Arc::new(AuditSink::open(&audit_path).expect("sink"));
        let broker = Broker::new(&config, provider, Vec::new(), audit);
        Fixture {
            _dir: dir,
            audit_path,
            broker,
        }
    }

    fn audit_lines(fixture: &Fixture) -> Vec<serde_json::Value> {
        std::fs::read_to_string(&fixture.audit_path)
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn test_unrecognised_reference() {
        let f = fixture(Arc::new(StaticProvider {
            elevations: Mutex::new(Vec::new()),
        }));
        let result = f.broker.handle_read("vault://x/y/z", None).await;
        assert_eq!(result.unwrap_err(), "Invalid URI");
        assert!(audit_lines(&f).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_vault() {
        let f = fixture(Arc::new(StaticProvider {
            elevations: Mutex::new(Vec::new()),
        }));
        let error = f
            .broker
            .handle_read("op://Elsewhere/k/f", Some("why"))
            .await
            .unwrap_err();
        assert!(error.contains("'Elsewhere'"), "{error}");
        assert!(error.contains("not configured"), "{error}");
    }

    #[tokio::test]
    async fn test_open_read_is_never_elevated() {
        let provider = Arc::new(StaticProvider {
            elevations: Mutex::new(Vec::new()),
        });
        let f = fixture(Arc::clone(&provider) as Arc<dyn SecretProvider>);
        let value = f.broker.handle_read("op://pub/k/f", None).await.unwrap();
        assert_eq!(value, "v");
        assert_eq!(*provider.elevations.lock().expect("lock"), vec![false]);
    }

    #[tokio::test]
    async fn test_missing_reason_is_not_audited() {
        let f = fixture(Arc::new(StaticProvider {
            elevations: Mutex::new(Vec::new()),
        }));
        let error = f.broker.handle_read("op://sec/k/f", None).await.unwrap_err();
        assert!(error.starts_with("Reason is REQUIRED"), "{error}");
        assert!(audit_lines(&f).is_empty());
    }

    #[tokio::test]
    async fn test_open_fetch_failure_is_audited() {
        let f = fixture(Arc::new(BrokenProvider));
        let error = f.broker.handle_read("op://pub/k/f", None).await.unwrap_err();
        assert_eq!(error, "backend down");
        let lines = audit_lines(&f);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["action"], "read");
        assert_eq!(lines[1]["action"], "read_error");
    }
}

//! Audit event vocabulary.
//!
//! The `action` tag and the `result` discriminator on `read`/`request`
//! events form the stable vocabulary consumed by offline tooling; renaming
//! a variant is a breaking change to the log format.

use serde::{Deserialize, Serialize};

/// How a `read` (or `request`) event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadResult {
    /// Open vault, returned without approval.
    Allowed,
    /// A standing-approval rule matched.
    StandingApproval,
    /// Fetch completed under a standing approval.
    StandingApprovedRead,
    /// Served from the value cache.
    CacheHit,
    /// Fetch completed after an explicit approval.
    ApprovedRead,
    /// Waiting for out-of-band approval.
    Pending,
}

/// A single audit record.
///
/// Serialises as one JSON object tagged by `action`; the sink injects a
/// `ts` timestamp at append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The daemon came up and bound its endpoints.
    DaemonStart {
        /// Unix socket path the request transport is bound to.
        socket: String,
        /// Loopback HTTP callback port.
        http_port: u16,
        /// Active provider name.
        provider: String,
        /// Active channel names.
        channels: Vec<String>,
    },
    /// The daemon is shutting down.
    DaemonStop {
        /// Number of pending requests resolved as denied by the shutdown.
        pending_denied: usize,
    },
    /// A read reached a decision.
    Read {
        /// How the read was resolved.
        result: ReadResult,
        /// Full secret reference.
        uri: String,
        /// Vault the reference names.
        vault: String,
        /// Item the reference names.
        item: String,
        /// Caller-supplied reason, when one was given.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Pending-request id, for reads that went through approval.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        /// Note from the standing rule that matched, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule_note: Option<String>,
    },
    /// A provider fetch failed.
    ReadError {
        /// Full secret reference.
        uri: String,
        /// Provider failure message.
        error: String,
        /// Pending-request id, when the failure followed an approval.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// An approval request was created and is awaiting resolution.
    Request {
        /// Always [`ReadResult::Pending`].
        result: ReadResult,
        /// Pending-request id.
        id: String,
        /// Full secret reference.
        uri: String,
        /// Caller-supplied reason.
        reason: String,
    },
    /// A pending request was approved.
    Approved {
        /// Pending-request id.
        id: String,
        /// Full secret reference.
        uri: String,
    },
    /// A pending request was explicitly denied.
    Denied {
        /// Pending-request id.
        id: String,
        /// Full secret reference.
        uri: String,
    },
    /// A pending request expired without a decision.
    Timeout {
        /// Pending-request id.
        id: String,
        /// Full secret reference.
        uri: String,
        /// The configured approval timeout.
        timeout_ms: u64,
    },
    /// A notification channel failed to deliver a prompt.
    ChannelError {
        /// Channel name.
        channel: String,
        /// Failure message.
        error: String,
        /// Pending-request id the prompt belonged to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tags_are_snake_case() {
        let event = AuditEvent::DaemonStop { pending_denied: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "daemon_stop");
        assert_eq!(json["pending_denied"], 2);
    }

    #[test]
    fn test_read_result_discriminator() {
        let event = AuditEvent::Read {
            result: ReadResult::CacheHit,
            uri: "op://sec/k/f".to_string(),
            vault: "sec".to_string(),
            item: "k".to_string(),
            reason: Some("deploy".to_string()),
            request_id: None,
            rule_note: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "read");
        assert_eq!(json["result"], "cache_hit");
        // Absent optionals are omitted entirely.
        assert!(json.get("request_id").is_none());
    }

    #[test]
    fn test_request_pending_shape() {
        let event = AuditEvent::Request {
            result: ReadResult::Pending,
            id: "0000000000000001".to_string(),
            uri: "op://sec/k/f".to_string(),
            reason: "check webhook".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "request");
        assert_eq!(json["result"], "pending");
    }

    #[test]
    fn test_roundtrip_ignores_injected_ts() {
        let raw = r#"{"action":"timeout","id":"0000000000000001","uri":"op://sec/k/f","timeout_ms":120000,"ts":"2026-01-01T00:00:00Z"}"#;
        let event: AuditEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, AuditEvent::Timeout { timeout_ms, .. } if timeout_ms == 120_000));
    }
}

//! Pending-request registry.
//!
//! The central map of outstanding approvals. Every callback ingress — HTTP,
//! drop directory, timer — converges on [`PendingRegistry::resolve`]; the
//! entry is removed under the lock before its resolver fires, so a request
//! is woken at most once no matter how many ingresses race.

use keyward_core::RequestId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// How a pending request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The operator approved.
    Approved,
    /// The operator explicitly denied.
    Denied,
    /// The deadline expired without a decision.
    TimedOut,
    /// The daemon is shutting down.
    Shutdown,
}

impl Resolution {
    /// Whether this resolution allows the fetch to proceed.
    #[must_use]
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// One outstanding approval.
struct PendingEntry {
    /// One-shot resolver; fired at most once, after map removal.
    resolver: oneshot::Sender<Resolution>,
    /// Deadline timer, aborted when something else resolves first.
    timer: Option<JoinHandle<()>>,
}

/// Registry of outstanding approvals with per-request deadline timers.
pub struct PendingRegistry {
    inner: Mutex<HashMap<RequestId, PendingEntry>>,
}

impl PendingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HashMap::new()),
        })
    }

    /// Register a pending request with a deadline of now + `timeout`.
    ///
    /// Returns the receiver the orchestrator suspends on. Deadline expiry
    /// resolves the entry with [`Resolution::TimedOut`] through the same
    /// exactly-once path as any callback.
    pub async fn register(
        self: &Arc<Self>,
        id: RequestId,
        timeout: Duration,
    ) -> oneshot::Receiver<Resolution> {
        let (tx, rx) = oneshot::channel();
        let registry = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.resolve(id, Resolution::TimedOut).await;
        });
        let mut guard = self.inner.lock().await;
        guard.insert(
            id,
            PendingEntry {
                resolver: tx,
                timer: Some(timer),
            },
        );
        rx
    }

    /// Resolve a pending request, waking its waiter.
    ///
    /// Returns `true` if a waiter was woken; `false` if no such id is
    /// pending (already resolved, timed out, or never registered) — the
    /// repeated call is a silent no-op.
    pub async fn resolve(&self, id: RequestId, resolution: Resolution) -> bool {
        let entry = {
            let mut guard = self.inner.lock().await;
            guard.remove(&id)
        };
        match entry {
            Some(entry) => {
                if let Some(timer) = entry.timer {
                    timer.abort();
                }
                // The waiter may have vanished (connection task dropped);
                // the send result is irrelevant either way.
                let _ = entry.resolver.send(resolution);
                debug!(id = %id, ?resolution, "pending request resolved");
                true
            }
            None => false,
        }
    }

    /// Remove a pending request without waking its waiter.
    pub async fn cancel(&self, id: RequestId) {
        let entry = {
            let mut guard = self.inner.lock().await;
            guard.remove(&id)
        };
        if let Some(entry) = entry {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
    }

    /// Number of outstanding approvals.
    pub async fn count(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Snapshot of the outstanding ids, for the drop-directory scanner.
    pub async fn pending_ids(&self) -> Vec<RequestId> {
        self.inner.lock().await.keys().copied().collect()
    }

    /// Resolve every outstanding request with the given resolution.
    ///
    /// Returns how many waiters were woken. Used by shutdown.
    pub async fn drain(&self, resolution: Resolution) -> usize {
        let entries: Vec<(RequestId, PendingEntry)> = {
            let mut guard = self.inner.lock().await;
            guard.drain().collect()
        };
        let drained = entries.len();
        for (id, entry) in entries {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            let _ = entry.resolver.send(resolution);
            debug!(id = %id, ?resolution, "pending request drained");
        }
        drained
    }
}

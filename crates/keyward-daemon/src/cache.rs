//! TTL-bounded value cache.
//!
//! Maps a raw secret reference to a previously approved value. Entries are
//! inserted only after a successful gated approval + fetch; eviction is
//! strictly TTL-based and lazy. There is no size bound — the gated working
//! set is human-paced and small.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CacheSlot {
    value: String,
    expires_at: Instant,
}

/// Process-local cache of approved secret values.
///
/// A TTL of zero or negative disables the cache entirely: lookups always
/// miss and stores are dropped.
pub struct ValueCache {
    ttl: Option<Duration>,
    inner: Mutex<HashMap<String, CacheSlot>>,
}

impl ValueCache {
    /// Create a cache with the configured TTL in milliseconds.
    #[must_use]
    pub fn new(ttl_ms: i64) -> Self {
        let ttl = u64::try_from(ttl_ms)
            .ok()
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis);
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Whether caching is active at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    /// Look up a reference, lazily evicting it when expired.
    pub async fn lookup(&self, reference: &str) -> Option<String> {
        self.ttl?;
        let mut guard = self.inner.lock().await;
        match guard.get(reference) {
            Some(slot) if slot.expires_at > Instant::now() => Some(slot.value.clone()),
            Some(_) => {
                guard.remove(reference);
                None
            }
            None => None,
        }
    }

    /// Store a freshly approved value.
    pub async fn store(&self, reference: &str, value: &str) {
        let Some(ttl) = self.ttl else { return };
        let mut guard = self.inner.lock().await;
        guard.insert(
            reference.to_string(),
            CacheSlot {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of entries currently held (including not-yet-evicted expired
    /// ones).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Maximum age of a cached payload before it must be recomputed
pub const FRESHNESS_WINDOW_MS: i64 = 2 * 60 * 1000;

/// One cached payload together with the identity it was fetched under
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    payload: T,
    identity: String,
    captured_at: DateTime<Utc>,
}

/// Session-scoped freshness cache.
///
/// A keyed store with an injected clock: every read decides whether the
/// entry is still servable given the caller's current identity, an explicit
/// refresh request and the entry's age. Misses evict; the caller recomputes
/// and writes back. The read-and-evict sequence runs under one lock so two
/// concurrent readers never interleave between the decision and the
/// eviction (concurrent misses recompute independently, last writer wins).
#[derive(Debug)]
pub struct SessionCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SessionCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> SessionCache<T> {

    /// Returns the cached payload for `key`, or `None` when the caller must
    /// recompute.
    ///
    /// Decision order: missing entry, identity mismatch, explicit refresh,
    /// age beyond the freshness window. Every miss except "missing entry"
    /// drops the stale entry on the way out.
    pub async fn read(
        &self,
        key: &str,
        current_identity: &str,
        explicit_refresh: bool,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let mut entries = self.entries.lock().await;

        let entry = entries.get(key)?;

        if entry.identity != current_identity {
            tracing::debug!(key = %key, "Cache entry evicted: identity changed");
            entries.remove(key);
            return None;
        }

        if explicit_refresh {
            tracing::debug!(key = %key, "Cache entry evicted: explicit refresh");
            entries.remove(key);
            return None;
        }

        let age_ms = now
            .signed_duration_since(entry.captured_at)
            .num_milliseconds();
        if age_ms > FRESHNESS_WINDOW_MS {
            tracing::debug!(key = %key, age_ms = age_ms, "Cache entry evicted: expired");
            entries.remove(key);
            return None;
        }

        Some(entry.payload.clone())
    }

    /// Stores a fresh entry unconditionally, overwriting any stale one.
    pub async fn write(&self, key: &str, identity: &str, payload: T, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                identity: identity.to_string(),
                captured_at: now,
            },
        );
    }
}

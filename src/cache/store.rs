use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Ttl
// ---------------------------------------------------------------------------

/// Freshness policy attached to each write. Completed draws and minted
/// tickets are immutable on chain, so their entries never need to expire;
/// everything still moving (jackpot, ticket counts) gets a short bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Bounded(Duration),
    /// Evicted only by explicit invalidation.
    Indefinite,
}

impl Ttl {
    pub fn seconds(secs: u64) -> Self {
        Ttl::Bounded(Duration::from_secs(secs))
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, Ttl::Indefinite)
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

struct CacheEntry {
    /// Whole-value replacement only; entries are never mutated in place.
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => false,
        }
    }
}

/// Keyed, TTL-aware store shared across the orchestrator, refresher and API.
/// Heterogeneous values hide behind `Any`; each key format maps to exactly
/// one value type, so downcasts on the read side are by construction.
///
/// Pure key-value semantics, no IO here. Persistence of indefinite entries
/// is a separate component fed by the orchestrator.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
        })
    }

    /// Typed read. Expired entries read as a miss and are evicted lazily.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            drop(entry);
            // Re-check under the entry lock: a writer may have refreshed the
            // key since the read guard dropped.
            self.entries
                .remove_if(key, |_, e| e.is_expired(Instant::now()));
            return None;
        }
        let value = Arc::clone(&entry.value);
        drop(entry);
        value.downcast::<T>().ok()
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: Arc<T>, ttl: Ttl) {
        let expires_at = match ttl {
            Ttl::Bounded(d) => Some(Instant::now() + d),
            Ttl::Indefinite => None,
        };
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many
    /// went. Callers targeting one series must pass a terminated prefix
    /// (`draw_3_`, not `draw_3`) so series 30 keys survive.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn invalidate_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Sweep expired entries. Reads already evict lazily; this keeps keys
    /// nobody asks for again from pinning memory.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Shared health state for the /health endpoint.
//! Updated by the orchestrator and refresher, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tier resolution counters. A "hit" is attributed to whichever tier
/// actually produced the value, so the three hit counters plus exhausted
/// fetches account for every resolve.
#[derive(Default)]
pub struct HealthState {
    pub cache_hits: AtomicU64,
    pub mirror_hits: AtomicU64,
    pub chain_reads: AtomicU64,
    pub exhausted_fetches: AtomicU64,
    /// Unix seconds of the last completed refresh cycle (0 = none yet).
    pub last_refresh_at: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirror_hits(&self) {
        self.mirror_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_chain_reads(&self) {
        self.chain_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exhausted_fetches(&self) {
        self.exhausted_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_refresh_at(&self, unix_secs: u64) {
        self.last_refresh_at.store(unix_secs, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn mirror_hits(&self) -> u64 {
        self.mirror_hits.load(Ordering::Relaxed)
    }

    pub fn chain_reads(&self) -> u64 {
        self.chain_reads.load(Ordering::Relaxed)
    }

    pub fn exhausted_fetches(&self) -> u64 {
        self.exhausted_fetches.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at(&self) -> u64 {
        self.last_refresh_at.load(Ordering::Relaxed)
    }
}

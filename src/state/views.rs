use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::Serialize;

use crate::pagination::PageInfo;
use crate::state::registry::ErrorView;
use crate::types::{LotteryDraw, LotteryTicket, SeriesInfo};

// ---------------------------------------------------------------------------
// View: the consumer triple
// ---------------------------------------------------------------------------

/// What every consumer read returns. `data: None` with `is_loading: true`
/// means "not resolved yet"; `None` with an error means the fallback chain
/// is exhausted; `None` with neither means nothing was ever requested.
#[derive(Debug, Clone, Serialize)]
pub struct View<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<ErrorView>,
}

/// One page of tickets plus where it sits in the full set. Serves both
/// participant lists and per-wallet ticket history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketPage {
    pub items: Vec<LotteryTicket>,
    pub page_info: PageInfo,
}

// ---------------------------------------------------------------------------
// ViewStore
// ---------------------------------------------------------------------------

/// Keyed projection of resolved entities, written only by the orchestrator
/// (whole-`Arc` replacement per write) and read by the HTTP surface and the
/// refresher. Keys are the same composite cache keys the store uses.
pub struct ViewStore {
    series_lists: DashMap<String, Arc<Vec<SeriesInfo>>>,
    series: DashMap<String, Arc<SeriesInfo>>,
    draws: DashMap<String, Arc<LotteryDraw>>,
    ticket_pages: DashMap<String, Arc<TicketPage>>,
    loading: DashSet<String>,
}

impl ViewStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            series_lists: DashMap::new(),
            series: DashMap::new(),
            draws: DashMap::new(),
            ticket_pages: DashMap::new(),
            loading: DashSet::new(),
        })
    }

    // ---- loading flags ----

    /// Claim the loading flag for `key`. Returns `None` when a fetch for
    /// the key is already in flight; callers then serve the current view
    /// instead of issuing a duplicate network trip. The returned guard
    /// clears the flag on drop, so no exit path (including cancellation)
    /// can leave it stuck.
    pub fn try_begin(&self, key: &str) -> Option<LoadingGuard<'_>> {
        if !self.loading.insert(key.to_string()) {
            return None;
        }
        Some(LoadingGuard {
            store: self,
            key: key.to_string(),
        })
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.loading.contains(key)
    }

    fn end_loading(&self, key: &str) {
        self.loading.remove(key);
    }

    // ---- projections ----

    pub fn put_series_list(&self, key: &str, list: Arc<Vec<SeriesInfo>>) {
        self.series_lists.insert(key.to_string(), list);
    }

    pub fn series_list(&self, key: &str) -> Option<Arc<Vec<SeriesInfo>>> {
        self.series_lists.get(key).map(|v| Arc::clone(&v))
    }

    pub fn put_series(&self, key: &str, series: Arc<SeriesInfo>) {
        self.series.insert(key.to_string(), series);
    }

    pub fn series(&self, key: &str) -> Option<Arc<SeriesInfo>> {
        self.series.get(key).map(|v| Arc::clone(&v))
    }

    pub fn put_draw(&self, key: &str, draw: Arc<LotteryDraw>) {
        self.draws.insert(key.to_string(), draw);
    }

    pub fn draw(&self, key: &str) -> Option<Arc<LotteryDraw>> {
        self.draws.get(key).map(|v| Arc::clone(&v))
    }

    pub fn put_ticket_page(&self, key: &str, page: Arc<TicketPage>) {
        self.ticket_pages.insert(key.to_string(), page);
    }

    pub fn ticket_page(&self, key: &str) -> Option<Arc<TicketPage>> {
        self.ticket_pages.get(key).map(|v| Arc::clone(&v))
    }

    /// Draws the refresher should keep fresh. Completed draws are immutable
    /// and never re-fetched.
    pub fn active_draws(&self) -> Vec<Arc<LotteryDraw>> {
        self.draws
            .iter()
            .filter(|entry| !entry.value().is_completed)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    // ---- invalidation ----

    /// Drop projections whose key starts with `prefix`, across all maps.
    pub fn remove_prefix(&self, prefix: &str) {
        self.series_lists.retain(|k, _| !k.starts_with(prefix));
        self.series.retain(|k, _| !k.starts_with(prefix));
        self.draws.retain(|k, _| !k.starts_with(prefix));
        self.ticket_pages.retain(|k, _| !k.starts_with(prefix));
    }

    /// Drop one exact key from all maps. For keys like `series_3` where a
    /// prefix sweep would also catch `series_30`.
    pub fn remove_key(&self, key: &str) {
        self.series_lists.remove(key);
        self.series.remove(key);
        self.draws.remove(key);
        self.ticket_pages.remove(key);
    }

    pub fn clear(&self) {
        self.series_lists.clear();
        self.series.clear();
        self.draws.clear();
        self.ticket_pages.clear();
    }

    pub fn tracked_draw_count(&self) -> usize {
        self.draws.len()
    }
}

/// Owns a claimed loading flag; clears it on drop.
pub struct LoadingGuard<'a> {
    store: &'a ViewStore,
    key: String,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.end_loading(&self.key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

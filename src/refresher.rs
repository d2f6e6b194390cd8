use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::interval;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::cache::CacheStore;
use crate::chain::contract::LotteryContract;
use crate::mirror::MirrorApi;
use crate::orchestrator::SyncOrchestrator;
use crate::state::views::ViewStore;
use crate::types::FetchOptions;

/// Periodically re-resolves what consumers are already looking at: the
/// series list and every tracked active draw. Completed draws are immutable
/// and never re-fetched. Each cycle also sweeps expired cache entries that
/// no read has evicted.
pub struct SyncRefresher<C, M> {
    orchestrator: Arc<SyncOrchestrator<C, M>>,
    cache: Arc<CacheStore>,
    views: Arc<ViewStore>,
    health: Arc<HealthState>,
    interval_secs: u64,
}

impl<C, M> SyncRefresher<C, M>
where
    C: LotteryContract + 'static,
    M: MirrorApi + 'static,
{
    pub fn new(
        orchestrator: Arc<SyncOrchestrator<C, M>>,
        cache: Arc<CacheStore>,
        views: Arc<ViewStore>,
        health: Arc<HealthState>,
        interval_secs: u64,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            views,
            health,
            interval_secs,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs.max(1)));
        // Skip the immediate first tick: bootstrap already fetched.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.refresh_cycle().await;
        }
    }

    /// One pass. Per-key failures are already registered by the
    /// orchestrator; the cycle itself only counts them.
    async fn refresh_cycle(&self) {
        let purged = self.cache.purge_expired();

        let series = self
            .orchestrator
            .fetch_all_series(&FetchOptions::force())
            .await;
        if let Some(error) = &series.error {
            warn!("[REFRESH] series list refresh failed: {}", error.message);
        }

        let active = self.views.active_draws();
        let mut refreshed = 0usize;
        let mut failed = 0usize;
        for draw in &active {
            let view = self
                .orchestrator
                .fetch_draw_data(draw.series_index, draw.draw_id, &FetchOptions::force())
                .await;
            if view.error.is_some() {
                failed += 1;
            } else {
                refreshed += 1;
            }
        }

        self.health.set_last_refresh_at(now_secs());
        info!(
            refreshed,
            failed,
            purged,
            tracked = self.views.tracked_draw_count(),
            "Refresh cycle complete: {refreshed} active draws refreshed, {failed} failed, {purged} expired entries purged",
        );
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::sync::{Arc, Weak};
use std::time::Instant;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::TierLatency;
use crate::batch::run_batched;
use crate::cache::{CacheStore, Ttl};
use crate::chain::contract::LotteryContract;
use crate::chain::reader::{parse_wallet, ChainReader};
use crate::config::{Config, SERIES_TTL_SECS};
use crate::db::persist::{EntryKind, PersistHandle, PersistOp};
use crate::error::{AppError, Result};
use crate::mirror::MirrorApi;
use crate::pagination::{change_page, paginate};
use crate::state::registry::{ErrorRegistry, ErrorView, RetryFn};
use crate::state::views::{TicketPage, View, ViewStore};
use crate::types::{
    draw_key, participants_key, series_key, user_tickets_key, DataSource, FetchOptions,
    LotteryDraw, LotteryTicket, SeriesInfo, SERIES_LIST_KEY,
};

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

/// Resolves every consumer read through the same tiers: cache first, then
/// the mirror API, then the contract itself. Whoever answers, the result
/// lands in the cache with a TTL chosen by what it is (immutable values
/// never expire) and is projected into the view store; only when every
/// tier fails does an error state with a retry hook get registered.
pub struct SyncOrchestrator<C, M> {
    chain: ChainReader<C>,
    mirror: Arc<M>,
    cache: Arc<CacheStore>,
    views: Arc<ViewStore>,
    errors: Arc<ErrorRegistry>,
    health: Arc<HealthState>,
    latency: Arc<TierLatency>,
    /// Absent in tests; fetches then simply skip the write-through.
    persist: Option<PersistHandle>,
    /// Handed to stored retry closures; weak, so a registered error never
    /// keeps a dropped orchestrator alive.
    me: Weak<Self>,
    batch_size: usize,
    page_size: usize,
    active_ttl: Ttl,
    series_ttl: Ttl,
}

/// Outcome of a ticket-list resolve. `complete` is false when some items
/// of a chain enumeration failed; partial lists never get an indefinite
/// TTL, so the gaps heal on the next fetch.
struct ResolvedTickets {
    tickets: Vec<LotteryTicket>,
    source: DataSource,
    complete: bool,
}

/// Where a page-change request can go.
enum PageNav {
    /// Out of range; the current view stays as it is.
    Rejected,
    /// Served synchronously from the cached full list.
    Reslice(View<TicketPage>),
    /// Full list fell out of cache (or was never fetched); re-fetch at
    /// this page.
    Refetch(usize),
}

impl<C, M> SyncOrchestrator<C, M>
where
    C: LotteryContract + 'static,
    M: MirrorApi + 'static,
{
    pub fn new(
        chain: ChainReader<C>,
        mirror: Arc<M>,
        cache: Arc<CacheStore>,
        views: Arc<ViewStore>,
        errors: Arc<ErrorRegistry>,
        health: Arc<HealthState>,
        latency: Arc<TierLatency>,
        persist: Option<PersistHandle>,
        cfg: &Config,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            chain,
            mirror,
            cache,
            views,
            errors,
            health,
            latency,
            persist,
            me: me.clone(),
            batch_size: cfg.batch_size,
            page_size: cfg.page_size,
            active_ttl: Ttl::seconds(cfg.active_ttl_secs),
            series_ttl: Ttl::seconds(SERIES_TTL_SECS),
        })
    }

    // ---- series ----

    pub async fn fetch_all_series(&self, opts: &FetchOptions) -> View<Vec<SeriesInfo>> {
        let key = SERIES_LIST_KEY;
        if !opts.force_refresh {
            if let Some(list) = self.cache.get::<Vec<SeriesInfo>>(key) {
                self.health.inc_cache_hits();
                self.errors.clear(key);
                self.views.put_series_list(key, Arc::clone(&list));
                return self.view_series_list(key);
            }
        }
        let Some(guard) = self.views.try_begin(key) else {
            return self.view_series_list(key);
        };
        self.errors.clear(key);

        let result = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => Err(AppError::Cancelled),
            r = self.resolve_series_list() => r,
        };

        match result {
            Ok((list, source)) => {
                self.cache.set(key, Arc::clone(&list), self.series_ttl);
                // Individual entries too, so per-series reads and name
                // lookups hit without another enumeration.
                for series in list.iter() {
                    self.cache.set(
                        &series_key(series.index),
                        Arc::new(series.clone()),
                        self.series_ttl,
                    );
                }
                self.views.put_series_list(key, Arc::clone(&list));
                self.record_hit(source);
                info!("[SYNC] series list resolved from {source}: {} series", list.len());
            }
            Err(AppError::Cancelled) => debug!("[SYNC] series list fetch cancelled"),
            Err(e) => {
                let retry = self.retry_series_list();
                self.record_exhausted(key, &e, retry);
            }
        }
        drop(guard);
        self.view_series_list(key)
    }

    pub async fn fetch_series_info(
        &self,
        series_index: u64,
        opts: &FetchOptions,
    ) -> View<SeriesInfo> {
        let key = series_key(series_index);
        if !opts.force_refresh {
            if let Some(series) = self.cache.get::<SeriesInfo>(&key) {
                self.health.inc_cache_hits();
                self.errors.clear(&key);
                self.views.put_series(&key, Arc::clone(&series));
                return self.view_series(&key);
            }
        }
        let Some(guard) = self.views.try_begin(&key) else {
            return self.view_series(&key);
        };
        self.errors.clear(&key);

        let result = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => Err(AppError::Cancelled),
            r = self.resolve_series(series_index) => r,
        };

        match result {
            Ok((series, source)) => {
                self.cache.set(&key, Arc::clone(&series), self.series_ttl);
                self.views.put_series(&key, Arc::clone(&series));
                self.record_hit(source);
            }
            Err(AppError::Cancelled) => debug!("[SYNC] series {series_index} fetch cancelled"),
            Err(e) => {
                let retry = self.retry_series(series_index);
                self.record_exhausted(&key, &e, retry);
            }
        }
        drop(guard);
        self.view_series(&key)
    }

    // ---- draws ----

    pub async fn fetch_draw_data(
        &self,
        series_index: u64,
        draw_id: u64,
        opts: &FetchOptions,
    ) -> View<LotteryDraw> {
        let key = draw_key(series_index, draw_id);
        if !opts.force_refresh {
            if let Some(draw) = self.cache.get::<LotteryDraw>(&key) {
                self.health.inc_cache_hits();
                self.errors.clear(&key);
                self.views.put_draw(&key, Arc::clone(&draw));
                return self.view_draw(&key);
            }
        }
        let Some(guard) = self.views.try_begin(&key) else {
            return self.view_draw(&key);
        };
        self.errors.clear(&key);

        let result = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => Err(AppError::Cancelled),
            r = self.resolve_draw(series_index, draw_id) => r,
        };

        match result {
            Ok((draw, source)) => {
                self.cache_draw(&key, &draw);
                self.views.put_draw(&key, Arc::clone(&draw));
                self.record_hit(source);
                debug!("[SYNC] draw {} resolved from {source}", draw.id);
            }
            Err(AppError::Cancelled) => {
                debug!("[SYNC] draw {series_index}-{draw_id} fetch cancelled");
            }
            Err(e) => {
                let retry = self.retry_draw(series_index, draw_id);
                self.record_exhausted(&key, &e, retry);
            }
        }
        drop(guard);
        self.view_draw(&key)
    }

    // ---- ticket lists ----

    pub async fn fetch_draw_participants(
        &self,
        series_index: u64,
        draw_id: u64,
        page: usize,
        opts: &FetchOptions,
    ) -> View<TicketPage> {
        let key = participants_key(series_index, draw_id);
        if !opts.force_refresh {
            if let Some(full) = self.cache.get::<Vec<LotteryTicket>>(&key) {
                self.health.inc_cache_hits();
                self.errors.clear(&key);
                self.project_page(&key, &full, page);
                return self.view_page(&key);
            }
        }
        let Some(guard) = self.views.try_begin(&key) else {
            return self.view_page(&key);
        };
        self.errors.clear(&key);

        let result = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => Err(AppError::Cancelled),
            r = self.resolve_participants(series_index, draw_id) => r,
        };

        match result {
            Ok(resolved) => {
                self.finish_tickets(&key, EntryKind::Participants, resolved, series_index, draw_id, page);
            }
            Err(AppError::Cancelled) => {
                debug!("[SYNC] participants fetch for draw {series_index}-{draw_id} cancelled");
            }
            Err(e) => {
                let retry = self.retry_participants(series_index, draw_id, page);
                self.record_exhausted(&key, &e, retry);
            }
        }
        drop(guard);
        self.view_page(&key)
    }

    pub async fn fetch_user_tickets(
        &self,
        series_index: u64,
        draw_id: u64,
        wallet_address: &str,
        page: usize,
        opts: &FetchOptions,
    ) -> View<TicketPage> {
        // Rejected before any key is claimed or any call goes out. Nothing
        // is registered either: there is no failed fetch to retry.
        let wallet = match parse_wallet(wallet_address) {
            Ok(wallet) => wallet,
            Err(e) => {
                warn!("[SYNC] {e}");
                return View {
                    data: None,
                    is_loading: false,
                    error: Some(ErrorView {
                        message: e.to_string(),
                        code: Some(e.code().to_string()),
                    }),
                };
            }
        };

        let key = user_tickets_key(series_index, draw_id, wallet_address);
        if !opts.force_refresh {
            if let Some(full) = self.cache.get::<Vec<LotteryTicket>>(&key) {
                self.health.inc_cache_hits();
                self.errors.clear(&key);
                self.project_page(&key, &full, page);
                return self.view_page(&key);
            }
        }
        let Some(guard) = self.views.try_begin(&key) else {
            return self.view_page(&key);
        };
        self.errors.clear(&key);

        let result = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => Err(AppError::Cancelled),
            r = self.resolve_user_tickets(wallet, series_index, draw_id) => r,
        };

        match result {
            Ok(resolved) => {
                self.finish_tickets(&key, EntryKind::UserTickets, resolved, series_index, draw_id, page);
            }
            Err(AppError::Cancelled) => {
                debug!("[SYNC] ticket history fetch for {wallet_address} cancelled");
            }
            Err(e) => {
                let retry =
                    self.retry_user_tickets(series_index, draw_id, wallet_address.to_string(), page);
                self.record_exhausted(&key, &e, retry);
            }
        }
        drop(guard);
        self.view_page(&key)
    }

    // ---- pagination ----

    /// Page navigation for a participant list. Re-slices synchronously from
    /// the cached full list; a list that fell out of cache is re-fetched at
    /// the requested page. Out-of-range requests leave the view untouched.
    pub async fn change_participants_page(
        &self,
        series_index: u64,
        draw_id: u64,
        requested: usize,
    ) -> View<TicketPage> {
        let key = participants_key(series_index, draw_id);
        match self.validate_page(&key, requested) {
            PageNav::Rejected => self.view_page(&key),
            PageNav::Reslice(view) => view,
            PageNav::Refetch(page) => {
                self.fetch_draw_participants(series_index, draw_id, page, &FetchOptions::default())
                    .await
            }
        }
    }

    pub async fn change_user_tickets_page(
        &self,
        series_index: u64,
        draw_id: u64,
        wallet_address: &str,
        requested: usize,
    ) -> View<TicketPage> {
        let key = user_tickets_key(series_index, draw_id, wallet_address);
        match self.validate_page(&key, requested) {
            PageNav::Rejected => self.view_page(&key),
            PageNav::Reslice(view) => view,
            PageNav::Refetch(page) => {
                self.fetch_user_tickets(series_index, draw_id, wallet_address, page, &FetchOptions::default())
                    .await
            }
        }
    }

    fn validate_page(&self, key: &str, requested: usize) -> PageNav {
        let Some(current) = self.views.ticket_page(key) else {
            // Nothing projected yet; treat it as a first fetch.
            return PageNav::Refetch(requested.max(1));
        };
        let Some(page) = change_page(&current.page_info, requested) else {
            return PageNav::Rejected;
        };
        match self.cache.get::<Vec<LotteryTicket>>(key) {
            Some(full) => {
                self.project_page(key, &full, page);
                PageNav::Reslice(self.view_page(key))
            }
            None => PageNav::Refetch(page),
        }
    }

    // ---- invalidation ----

    /// Drop every cached, projected and persisted entry for one series,
    /// plus the series list that indexes it. Prefixes are separator
    /// terminated so series 3 never sweeps series 30.
    pub fn invalidate_series(&self, series_index: u64) {
        let prefixes = [
            format!("draw_{series_index}_"),
            format!("participants_{series_index}_"),
            format!("user_tickets_{series_index}_"),
        ];
        let mut removed = 0usize;
        for prefix in &prefixes {
            removed += self.cache.invalidate_prefix(prefix);
            self.views.remove_prefix(prefix);
            self.errors.remove_prefix(prefix);
            self.persist_delete(PersistOp::DeletePrefix(prefix.clone()));
        }
        for key in [series_key(series_index), SERIES_LIST_KEY.to_string()] {
            self.cache.remove(&key);
            self.views.remove_key(&key);
            self.errors.clear(&key);
        }
        info!("[SYNC] invalidated series {series_index}: {removed} cache entries dropped");
    }

    pub fn invalidate_all(&self) {
        let removed = self.cache.invalidate_all();
        self.views.clear();
        self.errors.clear_all();
        self.persist_delete(PersistOp::DeleteAll);
        info!("[SYNC] invalidated all cached data: {removed} entries dropped");
    }

    /// Re-run the stored retry for a failed key. False when nothing failed
    /// there.
    pub async fn retry(&self, key: &str) -> bool {
        self.errors.retry(key).await
    }

    // ---- resolvers (cache misses land here) ----

    /// Enumerate every series on chain. Individual failures are tolerated;
    /// only a fully failed enumeration of a non-empty chain is an error.
    async fn resolve_series_list(&self) -> Result<(Arc<Vec<SeriesInfo>>, DataSource)> {
        let started = Instant::now();
        let count = self.chain.series_count().await?;

        let tasks: Vec<_> = (0..count)
            .map(|series_index| {
                let chain = &self.chain;
                async move { (series_index, chain.series_info(series_index).await) }
            })
            .collect();

        let mut list = Vec::with_capacity(tasks.len());
        let mut failed = 0usize;
        for (series_index, result) in run_batched(tasks, self.batch_size).await {
            match result {
                Ok(series) => list.push(series),
                Err(e) => {
                    failed += 1;
                    warn!("[SYNC] series {series_index} enumeration failed: {e}");
                }
            }
        }
        if count > 0 && list.is_empty() {
            return Err(AppError::Exhausted(format!("all {count} series fetches failed")));
        }
        if failed > 0 {
            warn!("[SYNC] series list resolved with {failed} of {count} series missing");
        }
        self.latency.record(DataSource::Chain, started.elapsed());
        Ok((Arc::new(list), DataSource::Chain))
    }

    async fn resolve_series(&self, series_index: u64) -> Result<(Arc<SeriesInfo>, DataSource)> {
        let started = Instant::now();
        let series = self.chain.series_info(series_index).await?;
        self.latency.record(DataSource::Chain, started.elapsed());
        Ok((Arc::new(series), DataSource::Chain))
    }

    async fn resolve_draw(
        &self,
        series_index: u64,
        draw_id: u64,
    ) -> Result<(Arc<LotteryDraw>, DataSource)> {
        let started = Instant::now();
        if let Some(draw) = self.mirror.draw(series_index, draw_id).await {
            self.latency.record(DataSource::Mirror, started.elapsed());
            return Ok((Arc::new(draw), DataSource::Mirror));
        }

        let started = Instant::now();
        let series_name = self.series_name_for(series_index).await;
        let draw = self
            .chain
            .draw_snapshot(series_index, &series_name, draw_id)
            .await?;
        self.latency.record(DataSource::Chain, started.elapsed());
        Ok((Arc::new(draw), DataSource::Chain))
    }

    async fn resolve_participants(
        &self,
        series_index: u64,
        draw_id: u64,
    ) -> Result<ResolvedTickets> {
        let started = Instant::now();
        if let Some(tickets) = self.mirror.participants(series_index, draw_id).await {
            let tickets = self.mark_winners(series_index, draw_id, tickets).await;
            self.latency.record(DataSource::Mirror, started.elapsed());
            return Ok(ResolvedTickets {
                tickets,
                source: DataSource::Mirror,
                complete: true,
            });
        }

        let started = Instant::now();
        let count = self.chain.ticket_count(draw_id).await?;
        let tasks: Vec<_> = (0..count)
            .map(|ticket_index| {
                let chain = &self.chain;
                async move { (ticket_index, chain.ticket(series_index, draw_id, ticket_index).await) }
            })
            .collect();

        let (tickets, failed) = collect_tickets(run_batched(tasks, self.batch_size).await, draw_id);
        if count > 0 && tickets.is_empty() {
            return Err(AppError::Exhausted(format!(
                "all {count} ticket fetches failed for draw {draw_id}"
            )));
        }
        let tickets = self.mark_winners(series_index, draw_id, tickets).await;
        self.latency.record(DataSource::Chain, started.elapsed());
        Ok(ResolvedTickets {
            tickets,
            source: DataSource::Chain,
            complete: failed == 0,
        })
    }

    async fn resolve_user_tickets(
        &self,
        wallet: Address,
        series_index: u64,
        draw_id: u64,
    ) -> Result<ResolvedTickets> {
        let started = Instant::now();
        let count = self.chain.user_ticket_count(wallet, draw_id).await?;
        let tasks: Vec<_> = (0..count)
            .map(|ticket_index| {
                let chain = &self.chain;
                async move {
                    (
                        ticket_index,
                        chain.user_ticket(wallet, series_index, draw_id, ticket_index).await,
                    )
                }
            })
            .collect();

        let (tickets, failed) = collect_tickets(run_batched(tasks, self.batch_size).await, draw_id);
        if count > 0 && tickets.is_empty() {
            return Err(AppError::Exhausted(format!(
                "all {count} ticket fetches failed for wallet {wallet:#x}"
            )));
        }
        let tickets = self.mark_winners(series_index, draw_id, tickets).await;
        self.latency.record(DataSource::Chain, started.elapsed());
        Ok(ResolvedTickets {
            tickets,
            source: DataSource::Chain,
            complete: failed == 0,
        })
    }

    // ---- helpers ----

    /// Series name for chain-built draw snapshots. Cached series win; a
    /// cold cache resolves (and caches) the series; past that the name
    /// degrades to a placeholder rather than failing the draw.
    async fn series_name_for(&self, series_index: u64) -> String {
        let key = series_key(series_index);
        if let Some(series) = self.cache.get::<SeriesInfo>(&key) {
            return series.name.clone();
        }
        match self.chain.series_info(series_index).await {
            Ok(series) => {
                let name = series.name.clone();
                self.cache.set(&key, Arc::new(series), self.series_ttl);
                name
            }
            Err(e) => {
                warn!("[SYNC] series name unavailable for {series_index}: {e}");
                format!("Series {series_index}")
            }
        }
    }

    /// Fill `is_winner` once the draw has completed and its numbers are
    /// known. Tickets of an open draw pass through untouched.
    async fn mark_winners(
        &self,
        series_index: u64,
        draw_id: u64,
        mut tickets: Vec<LotteryTicket>,
    ) -> Vec<LotteryTicket> {
        if tickets.is_empty() {
            return tickets;
        }
        let Some(draw) = self.ensure_draw(series_index, draw_id).await else {
            return tickets;
        };
        let Some(winning) = draw.winning_numbers else {
            return tickets;
        };
        for ticket in &mut tickets {
            ticket.is_winner = Some(ticket.matches_winning(&winning));
        }
        tickets
    }

    /// The draw entity backing a ticket list, cached as a side effect when
    /// it had to be resolved.
    async fn ensure_draw(&self, series_index: u64, draw_id: u64) -> Option<Arc<LotteryDraw>> {
        let key = draw_key(series_index, draw_id);
        if let Some(draw) = self.cache.get::<LotteryDraw>(&key) {
            return Some(draw);
        }
        match self.resolve_draw(series_index, draw_id).await {
            Ok((draw, _)) => {
                self.cache_draw(&key, &draw);
                Some(draw)
            }
            Err(e) => {
                warn!("[SYNC] draw {series_index}-{draw_id} unavailable for winner marking: {e}");
                None
            }
        }
    }

    /// Completed draws are immutable: cached without expiry and written
    /// through to SQLite. Active draws get the short TTL.
    fn cache_draw(&self, key: &str, draw: &Arc<LotteryDraw>) {
        let ttl = if draw.is_completed {
            Ttl::Indefinite
        } else {
            self.active_ttl
        };
        self.cache.set(key, Arc::clone(draw), ttl);
        if ttl.is_indefinite() {
            self.persist_value(key, EntryKind::Draw, draw.as_ref());
        }
    }

    fn finish_tickets(
        &self,
        key: &str,
        kind: EntryKind,
        resolved: ResolvedTickets,
        series_index: u64,
        draw_id: u64,
        page: usize,
    ) {
        let full = Arc::new(resolved.tickets);
        let draw_completed = self
            .cache
            .get::<LotteryDraw>(&draw_key(series_index, draw_id))
            .map(|d| d.is_completed)
            .unwrap_or(false);
        let ttl = if draw_completed && resolved.complete {
            Ttl::Indefinite
        } else {
            self.active_ttl
        };
        self.cache.set(key, Arc::clone(&full), ttl);
        if ttl.is_indefinite() {
            self.persist_value(key, kind, full.as_ref());
        }
        self.project_page(key, &full, page);
        self.record_hit(resolved.source);
        debug!("[SYNC] {key}: {} tickets from {}", full.len(), resolved.source);
    }

    fn project_page(&self, key: &str, full: &[LotteryTicket], page: usize) {
        let (items, page_info) = paginate(full, page, self.page_size);
        self.views.put_ticket_page(key, Arc::new(TicketPage { items, page_info }));
    }

    fn record_hit(&self, source: DataSource) {
        match source {
            DataSource::Cache => self.health.inc_cache_hits(),
            DataSource::Mirror => self.health.inc_mirror_hits(),
            DataSource::Chain => self.health.inc_chain_reads(),
        }
    }

    fn record_exhausted(&self, key: &str, err: &AppError, retry: RetryFn) {
        warn!("[SYNC] {key}: every source failed: {err}");
        self.health.inc_exhausted_fetches();
        self.errors
            .record(key, err.to_string(), Some(err.code().to_string()), retry);
    }

    fn persist_value<T: Serialize>(&self, key: &str, kind: EntryKind, value: &T) {
        let Some(handle) = &self.persist else { return };
        match serde_json::to_string(value) {
            Ok(payload) => {
                let op = PersistOp::Upsert {
                    key: key.to_string(),
                    kind,
                    payload,
                };
                if let Err(e) = handle.enqueue(op) {
                    warn!("[SYNC] persist enqueue failed for {key}: {e}");
                }
            }
            Err(e) => warn!("[SYNC] could not serialize {key} for persistence: {e}"),
        }
    }

    fn persist_delete(&self, op: PersistOp) {
        let Some(handle) = &self.persist else { return };
        if let Err(e) = handle.enqueue(op) {
            warn!("[SYNC] persist enqueue failed: {e}");
        }
    }

    // ---- view assembly ----

    fn view_series_list(&self, key: &str) -> View<Vec<SeriesInfo>> {
        View {
            data: self.views.series_list(key).map(|v| v.as_ref().clone()),
            is_loading: self.views.is_loading(key),
            error: self.errors.get(key),
        }
    }

    fn view_series(&self, key: &str) -> View<SeriesInfo> {
        View {
            data: self.views.series(key).map(|v| v.as_ref().clone()),
            is_loading: self.views.is_loading(key),
            error: self.errors.get(key),
        }
    }

    fn view_draw(&self, key: &str) -> View<LotteryDraw> {
        View {
            data: self.views.draw(key).map(|v| v.as_ref().clone()),
            is_loading: self.views.is_loading(key),
            error: self.errors.get(key),
        }
    }

    fn view_page(&self, key: &str) -> View<TicketPage> {
        View {
            data: self.views.ticket_page(key).map(|v| v.as_ref().clone()),
            is_loading: self.views.is_loading(key),
            error: self.errors.get(key),
        }
    }

    // ---- stored retries ----

    fn retry_series_list(&self) -> RetryFn {
        let me = self.me.clone();
        Arc::new(move || {
            let me = me.clone();
            Box::pin(async move {
                if let Some(orch) = me.upgrade() {
                    orch.fetch_all_series(&FetchOptions::default()).await;
                }
            })
        })
    }

    fn retry_series(&self, series_index: u64) -> RetryFn {
        let me = self.me.clone();
        Arc::new(move || {
            let me = me.clone();
            Box::pin(async move {
                if let Some(orch) = me.upgrade() {
                    orch.fetch_series_info(series_index, &FetchOptions::default()).await;
                }
            })
        })
    }

    fn retry_draw(&self, series_index: u64, draw_id: u64) -> RetryFn {
        let me = self.me.clone();
        Arc::new(move || {
            let me = me.clone();
            Box::pin(async move {
                if let Some(orch) = me.upgrade() {
                    orch.fetch_draw_data(series_index, draw_id, &FetchOptions::default())
                        .await;
                }
            })
        })
    }

    fn retry_participants(&self, series_index: u64, draw_id: u64, page: usize) -> RetryFn {
        let me = self.me.clone();
        Arc::new(move || {
            let me = me.clone();
            Box::pin(async move {
                if let Some(orch) = me.upgrade() {
                    orch.fetch_draw_participants(
                        series_index,
                        draw_id,
                        page,
                        &FetchOptions::default(),
                    )
                    .await;
                }
            })
        })
    }

    fn retry_user_tickets(
        &self,
        series_index: u64,
        draw_id: u64,
        wallet: String,
        page: usize,
    ) -> RetryFn {
        let me = self.me.clone();
        Arc::new(move || {
            let me = me.clone();
            let wallet = wallet.clone();
            Box::pin(async move {
                if let Some(orch) = me.upgrade() {
                    orch.fetch_user_tickets(
                        series_index,
                        draw_id,
                        &wallet,
                        page,
                        &FetchOptions::default(),
                    )
                    .await;
                }
            })
        })
    }
}

/// Split a batched enumeration into kept tickets and a failure count,
/// logging each miss.
fn collect_tickets(
    results: Vec<(u64, Result<LotteryTicket>)>,
    draw_id: u64,
) -> (Vec<LotteryTicket>, usize) {
    let mut tickets = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (ticket_index, result) in results {
        match result {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => {
                failed += 1;
                warn!("[SYNC] ticket {ticket_index} of draw {draw_id} failed: {e}");
            }
        }
    }
    (tickets, failed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

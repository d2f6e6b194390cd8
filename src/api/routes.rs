use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, TierLatency};
use crate::cache::CacheStore;
use crate::chain::contract::EvmLotteryClient;
use crate::mirror::MirrorClient;
use crate::orchestrator::SyncOrchestrator;
use crate::state::registry::ErrorRegistry;
use crate::state::views::{TicketPage, View};
use crate::types::{FetchOptions, LotteryDraw, SeriesInfo};

/// The orchestrator as wired in production.
pub type LiveOrchestrator = SyncOrchestrator<EvmLotteryClient, MirrorClient>;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<LiveOrchestrator>,
    pub cache: Arc<CacheStore>,
    pub errors: Arc<ErrorRegistry>,
    pub health: Arc<HealthState>,
    pub latency: Arc<TierLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/series", get(get_series))
        .route("/series/:series_index", get(get_series_info))
        .route("/series/:series_index/draws/:draw_id", get(get_draw))
        .route(
            "/series/:series_index/draws/:draw_id/participants",
            get(get_participants),
        )
        .route(
            "/series/:series_index/draws/:draw_id/participants/page",
            post(post_participants_page),
        )
        .route(
            "/series/:series_index/draws/:draw_id/users/:address/tickets",
            get(get_user_tickets),
        )
        .route(
            "/series/:series_index/draws/:draw_id/users/:address/tickets/page",
            post(post_user_tickets_page),
        )
        .route("/invalidate", post(post_invalidate))
        .route("/retry/*key", post(post_retry))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query and body params
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FetchParams {
    /// `?force=true` skips the cache read; the result still lands in it.
    pub force: Option<bool>,
}

#[derive(Deserialize)]
pub struct PagedFetchParams {
    pub page: Option<usize>,
    pub force: Option<bool>,
}

#[derive(Deserialize)]
pub struct InvalidateParams {
    /// Scope to one series; absent clears everything.
    pub series_index: Option<u64>,
}

#[derive(Deserialize)]
pub struct PageBody {
    pub page: usize,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cached_entries: usize,
    pub cache_hits: u64,
    pub mirror_hits: u64,
    pub chain_reads: u64,
    pub exhausted_fetches: u64,
    pub open_errors: usize,
    pub last_refresh_at: u64,
}

#[derive(Serialize)]
pub struct RetryResponse {
    pub key: String,
    pub retried: bool,
}

#[derive(Serialize)]
pub struct InvalidateResponse {
    pub scope: String,
}

fn options(force: Option<bool>) -> FetchOptions {
    if force.unwrap_or(false) {
        FetchOptions::force()
    } else {
        FetchOptions::default()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_entries: state.cache.entry_count(),
        cache_hits: state.health.cache_hits(),
        mirror_hits: state.health.mirror_hits(),
        chain_reads: state.health.chain_reads(),
        exhausted_fetches: state.health.exhausted_fetches(),
        open_errors: state.errors.error_count(),
        last_refresh_at: state.health.last_refresh_at(),
    })
}

async fn get_series(
    State(state): State<ApiState>,
    Query(params): Query<FetchParams>,
) -> Json<View<Vec<SeriesInfo>>> {
    Json(state.orchestrator.fetch_all_series(&options(params.force)).await)
}

async fn get_series_info(
    State(state): State<ApiState>,
    Path(series_index): Path<u64>,
    Query(params): Query<FetchParams>,
) -> Json<View<SeriesInfo>> {
    Json(
        state
            .orchestrator
            .fetch_series_info(series_index, &options(params.force))
            .await,
    )
}

async fn get_draw(
    State(state): State<ApiState>,
    Path((series_index, draw_id)): Path<(u64, u64)>,
    Query(params): Query<FetchParams>,
) -> Json<View<LotteryDraw>> {
    Json(
        state
            .orchestrator
            .fetch_draw_data(series_index, draw_id, &options(params.force))
            .await,
    )
}

async fn get_participants(
    State(state): State<ApiState>,
    Path((series_index, draw_id)): Path<(u64, u64)>,
    Query(params): Query<PagedFetchParams>,
) -> Json<View<TicketPage>> {
    let page = params.page.unwrap_or(1);
    Json(
        state
            .orchestrator
            .fetch_draw_participants(series_index, draw_id, page, &options(params.force))
            .await,
    )
}

async fn post_participants_page(
    State(state): State<ApiState>,
    Path((series_index, draw_id)): Path<(u64, u64)>,
    Json(body): Json<PageBody>,
) -> Json<View<TicketPage>> {
    Json(
        state
            .orchestrator
            .change_participants_page(series_index, draw_id, body.page)
            .await,
    )
}

async fn get_user_tickets(
    State(state): State<ApiState>,
    Path((series_index, draw_id, address)): Path<(u64, u64, String)>,
    Query(params): Query<PagedFetchParams>,
) -> Json<View<TicketPage>> {
    let page = params.page.unwrap_or(1);
    Json(
        state
            .orchestrator
            .fetch_user_tickets(series_index, draw_id, &address, page, &options(params.force))
            .await,
    )
}

async fn post_user_tickets_page(
    State(state): State<ApiState>,
    Path((series_index, draw_id, address)): Path<(u64, u64, String)>,
    Json(body): Json<PageBody>,
) -> Json<View<TicketPage>> {
    Json(
        state
            .orchestrator
            .change_user_tickets_page(series_index, draw_id, &address, body.page)
            .await,
    )
}

async fn post_invalidate(
    State(state): State<ApiState>,
    Query(params): Query<InvalidateParams>,
) -> Json<InvalidateResponse> {
    let scope = match params.series_index {
        Some(series_index) => {
            state.orchestrator.invalidate_series(series_index);
            format!("series {series_index}")
        }
        None => {
            state.orchestrator.invalidate_all();
            "all".to_string()
        }
    };
    Json(InvalidateResponse { scope })
}

async fn post_retry(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Json<RetryResponse> {
    let retried = state.orchestrator.retry(&key).await;
    Json(RetryResponse { key, retried })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

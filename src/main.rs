mod batch;
mod cache;
mod chain;
mod config;
mod db;
mod error;
mod mirror;
mod orchestrator;
mod pagination;
mod refresher;
mod state;
mod types;
mod api;

use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::TierLatency;
use crate::api::routes::{ApiState, router};
use crate::cache::CacheStore;
use crate::chain::contract::EvmLotteryClient;
use crate::chain::reader::ChainReader;
use crate::config::Config;
use crate::db::persist::{warm_start, CachePersister};
use crate::error::Result;
use crate::mirror::MirrorClient;
use crate::orchestrator::SyncOrchestrator;
use crate::refresher::SyncRefresher;
use crate::state::registry::ErrorRegistry;
use crate::state::views::ViewStore;
use crate::types::FetchOptions;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let db_options = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(db_options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- In-memory stores ---
    let cache = CacheStore::new();
    let views = ViewStore::new();
    let errors = ErrorRegistry::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(TierLatency::new());

    // --- Warm start: restore immutable entries persisted by prior runs ---
    let restored = warm_start(&pool, &cache).await?;
    info!("Warm start: {restored} cache entries restored");

    // --- Network tiers ---
    let contract = EvmLotteryClient::connect(&cfg.rpc_url, &cfg.contract_address)?;
    let chain = ChainReader::new(Arc::new(contract));
    info!(
        "Chain reader ready: contract {} via {}",
        cfg.contract_address, cfg.rpc_url
    );

    if cfg.mirror_api_url.is_none() {
        warn!("MIRROR_API_URL not set; mirror tier disabled, cache misses go straight to the chain");
    }
    let mirror = Arc::new(MirrorClient::new(cfg.mirror_api_url.clone())?);

    // --- Cache persistence writer ---
    let (persister, persist_handle) = CachePersister::new(pool.clone());
    tokio::spawn(async move { persister.run().await });

    // --- Orchestrator ---
    let orchestrator = SyncOrchestrator::new(
        chain,
        Arc::clone(&mirror),
        Arc::clone(&cache),
        Arc::clone(&views),
        Arc::clone(&errors),
        Arc::clone(&health),
        Arc::clone(&latency),
        Some(persist_handle),
        &cfg,
    );

    // --- Bootstrap: prime the series list before serving ---
    let bootstrap = orchestrator.fetch_all_series(&FetchOptions::default()).await;
    if let Some(series) = &bootstrap.data {
        info!("Bootstrap complete: {} series discovered", series.len());
    } else if let Some(err) = &bootstrap.error {
        warn!(
            "Bootstrap fetch failed ({}); background refresh will retry",
            err.message
        );
    }

    // --- Background refresher ---
    let refresher = SyncRefresher::new(
        Arc::clone(&orchestrator),
        Arc::clone(&cache),
        Arc::clone(&views),
        Arc::clone(&health),
        cfg.refresh_interval_secs,
    );
    tokio::spawn(async move { refresher.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        orchestrator: Arc::clone(&orchestrator),
        cache: Arc::clone(&cache),
        errors: Arc::clone(&errors),
        health: Arc::clone(&health),
        latency: Arc::clone(&latency),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cache::{CacheStore, Ttl};
use crate::config::CHANNEL_CAPACITY;
use crate::error::{AppError, Result};
use crate::types::{LotteryDraw, LotteryTicket};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// What a persisted payload deserializes into on warm start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Draw,
    Participants,
    UserTickets,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Draw => "draw",
            EntryKind::Participants => "participants",
            EntryKind::UserTickets => "user_tickets",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "draw" => Some(EntryKind::Draw),
            "participants" => Some(EntryKind::Participants),
            "user_tickets" => Some(EntryKind::UserTickets),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum PersistOp {
    Upsert {
        key: String,
        kind: EntryKind,
        payload: String,
    },
    DeletePrefix(String),
    DeleteAll,
}

// ---------------------------------------------------------------------------
// PersistHandle
// ---------------------------------------------------------------------------

/// Sending side of the persistence queue. `enqueue` never waits: when the
/// queue is full the op is dropped with an error instead of stalling a
/// fetch. Losing a persist write only costs a re-fetch after restart.
#[derive(Clone)]
pub struct PersistHandle {
    tx: mpsc::Sender<PersistOp>,
}

impl PersistHandle {
    pub fn enqueue(&self, op: PersistOp) -> Result<()> {
        self.tx
            .try_send(op)
            .map_err(|e| AppError::ChannelSend(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// CachePersister
// ---------------------------------------------------------------------------

/// Writes indefinite cache entries through to SQLite so completed draws and
/// their ticket lists survive a restart. Runs as a dedicated background
/// task fed by the orchestrator; the fetch path only ever touches the
/// channel.
pub struct CachePersister {
    pool: SqlitePool,
    rx: mpsc::Receiver<PersistOp>,
}

impl CachePersister {
    pub fn new(pool: SqlitePool) -> (Self, PersistHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self { pool, rx }, PersistHandle { tx })
    }

    pub async fn run(mut self) {
        while let Some(op) = self.rx.recv().await {
            if let Err(e) = self.apply(&op).await {
                error!("[DB] persist failed: {e}");
            }
        }
        debug!("[DB] persist queue closed, exiting");
    }

    async fn apply(&self, op: &PersistOp) -> Result<()> {
        match op {
            PersistOp::Upsert { key, kind, payload } => {
                sqlx::query(
                    r#"
                    INSERT INTO cache_entries (key, kind, payload, stored_at)
                    VALUES (?1, ?2, ?3, strftime('%s', 'now'))
                    ON CONFLICT(key) DO UPDATE SET
                        kind = excluded.kind,
                        payload = excluded.payload,
                        stored_at = excluded.stored_at
                    "#,
                )
                .bind(key)
                .bind(kind.as_str())
                .bind(payload)
                .execute(&self.pool)
                .await?;
            }
            PersistOp::DeletePrefix(prefix) => {
                // substr comparison, not LIKE: keys contain underscores,
                // which LIKE would treat as single-char wildcards.
                sqlx::query("DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1")
                    .bind(prefix)
                    .execute(&self.pool)
                    .await?;
            }
            PersistOp::DeleteAll => {
                sqlx::query("DELETE FROM cache_entries")
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Warm start
// ---------------------------------------------------------------------------

/// Reload persisted entries into the cache at startup, all with indefinite
/// TTL (only immutable values are ever persisted). Rows that no longer
/// deserialize are deleted rather than carried forward.
pub async fn warm_start(pool: &SqlitePool, cache: &CacheStore) -> Result<usize> {
    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT key, kind, payload FROM cache_entries")
            .fetch_all(pool)
            .await?;

    let mut restored = 0usize;
    let mut undecodable = Vec::new();
    for (key, kind, payload) in rows {
        let ok = match EntryKind::parse(&kind) {
            Some(EntryKind::Draw) => serde_json::from_str::<LotteryDraw>(&payload)
                .map(|draw| cache.set(&key, Arc::new(draw), Ttl::Indefinite))
                .is_ok(),
            Some(EntryKind::Participants) | Some(EntryKind::UserTickets) => {
                serde_json::from_str::<Vec<LotteryTicket>>(&payload)
                    .map(|tickets| cache.set(&key, Arc::new(tickets), Ttl::Indefinite))
                    .is_ok()
            }
            None => false,
        };
        if ok {
            restored += 1;
        } else {
            undecodable.push(key);
        }
    }

    for key in &undecodable {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?1")
            .bind(key)
            .execute(pool)
            .await?;
    }
    if !undecodable.is_empty() {
        info!(
            "[DB] dropped {} persisted entries that no longer decode",
            undecodable.len()
        );
    }
    Ok(restored)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection so the in-memory database is shared by every query.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn completed_draw(series_index: u64, draw_id: u64) -> LotteryDraw {
        LotteryDraw {
            id: LotteryDraw::composite_id(series_index, draw_id),
            draw_id,
            series_index,
            series_name: "Weekly".to_string(),
            start_time: 1_700_000_000,
            end_time: 1_700_600_000,
            is_completed: true,
            jackpot_amount: "1250".to_string(),
            ticket_price: "0.5".to_string(),
            participant_count: 3,
            winning_numbers: Some([5, 12, 23, 31, 44, 9]),
            winner_address: Some("0x00000000000000000000000000000000000000aa".to_string()),
            prize_amount: Some("625".to_string()),
            transaction_hash: None,
        }
    }

    async fn drain(handle: PersistHandle, persister: CachePersister) {
        drop(handle);
        persister.run().await;
    }

    #[tokio::test]
    async fn upsert_survives_warm_start() {
        let pool = test_pool().await;
        let (persister, handle) = CachePersister::new(pool.clone());

        let draw = completed_draw(1, 3);
        handle
            .enqueue(PersistOp::Upsert {
                key: "draw_1_3".to_string(),
                kind: EntryKind::Draw,
                payload: serde_json::to_string(&draw).unwrap(),
            })
            .unwrap();
        drain(handle, persister).await;

        let cache = CacheStore::new();
        let restored = warm_start(&pool, &cache).await.unwrap();
        assert_eq!(restored, 1);

        let cached = cache.get::<LotteryDraw>("draw_1_3").unwrap();
        assert_eq!(cached.id, "1-3");
        assert_eq!(cached.winning_numbers, Some([5, 12, 23, 31, 44, 9]));
    }

    #[tokio::test]
    async fn upsert_replaces_prior_payload() {
        let pool = test_pool().await;
        let (persister, handle) = CachePersister::new(pool.clone());

        let mut draw = completed_draw(2, 5);
        handle
            .enqueue(PersistOp::Upsert {
                key: "draw_2_5".to_string(),
                kind: EntryKind::Draw,
                payload: serde_json::to_string(&draw).unwrap(),
            })
            .unwrap();
        draw.participant_count = 40;
        handle
            .enqueue(PersistOp::Upsert {
                key: "draw_2_5".to_string(),
                kind: EntryKind::Draw,
                payload: serde_json::to_string(&draw).unwrap(),
            })
            .unwrap();
        drain(handle, persister).await;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let cache = CacheStore::new();
        warm_start(&pool, &cache).await.unwrap();
        assert_eq!(
            cache.get::<LotteryDraw>("draw_2_5").unwrap().participant_count,
            40
        );
    }

    #[tokio::test]
    async fn delete_prefix_respects_key_separators() {
        let pool = test_pool().await;
        let (persister, handle) = CachePersister::new(pool.clone());

        for (key, series_index, draw_id) in
            [("draw_3_1", 3, 1), ("draw_3_2", 3, 2), ("draw_30_1", 30, 1)]
        {
            handle
                .enqueue(PersistOp::Upsert {
                    key: key.to_string(),
                    kind: EntryKind::Draw,
                    payload: serde_json::to_string(&completed_draw(series_index, draw_id))
                        .unwrap(),
                })
                .unwrap();
        }
        handle
            .enqueue(PersistOp::DeletePrefix("draw_3_".to_string()))
            .unwrap();
        drain(handle, persister).await;

        let cache = CacheStore::new();
        let restored = warm_start(&pool, &cache).await.unwrap();
        assert_eq!(restored, 1);
        assert!(cache.get::<LotteryDraw>("draw_30_1").is_some());
        assert!(cache.get::<LotteryDraw>("draw_3_1").is_none());
    }

    #[tokio::test]
    async fn undecodable_rows_are_dropped() {
        let pool = test_pool().await;
        let (persister, handle) = CachePersister::new(pool.clone());

        handle
            .enqueue(PersistOp::Upsert {
                key: "draw_9_9".to_string(),
                kind: EntryKind::Draw,
                payload: "{not json".to_string(),
            })
            .unwrap();
        drain(handle, persister).await;

        let cache = CacheStore::new();
        let restored = warm_start(&pool, &cache).await.unwrap();
        assert_eq!(restored, 0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}

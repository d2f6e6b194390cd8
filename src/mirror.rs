use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::MIRROR_TIMEOUT_SECS;
use crate::error::Result;
use crate::types::{LotteryDraw, LotteryTicket};

/// Optional REST shortcut in front of the chain. Everything here is
/// advisory: any failure reads as `None` and the caller falls through to
/// the contract, so correctness never depends on the mirror being up.
#[async_trait]
pub trait MirrorApi: Send + Sync {
    async fn draw(&self, series_index: u64, draw_id: u64) -> Option<LotteryDraw>;
    async fn participants(&self, series_index: u64, draw_id: u64) -> Option<Vec<LotteryTicket>>;
}

// ---------------------------------------------------------------------------
// MirrorClient
// ---------------------------------------------------------------------------

pub struct MirrorClient {
    client: reqwest::Client,
    /// None disables the tier; every fetch is then an instant miss.
    base_url: Option<String>,
}

impl MirrorClient {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(MIRROR_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// One attempt against the mirror. Disabled tier, transport error,
    /// non-2xx and undecodable payloads all read as `None`.
    async fn try_fetch<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let base = self.base_url.as_ref()?;
        let url = format!("{base}{path}");
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("[MIRROR] {path}: request failed: {e}");
                return None;
            }
        };
        if !resp.status().is_success() {
            debug!("[MIRROR] {path}: status {}", resp.status());
            return None;
        }
        match resp.json::<T>().await {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("[MIRROR] {path}: undecodable payload: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl MirrorApi for MirrorClient {
    async fn draw(&self, series_index: u64, draw_id: u64) -> Option<LotteryDraw> {
        let dto: MirrorDraw = self
            .try_fetch(&format!(
                "/api/lottery/series/{series_index}/draws/{draw_id}"
            ))
            .await?;
        Some(dto.into_draw(series_index, draw_id))
    }

    async fn participants(&self, series_index: u64, draw_id: u64) -> Option<Vec<LotteryTicket>> {
        let dtos: Vec<MirrorTicket> = self
            .try_fetch(&format!("/api/lottery/{draw_id}/participants"))
            .await?;
        Some(
            dtos.into_iter()
                .map(|t| t.into_ticket(series_index, draw_id))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Wire DTOs: the mirror speaks the dApp's camelCase JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorDraw {
    #[serde(default)]
    series_name: String,
    start_time: u64,
    end_time: u64,
    #[serde(default)]
    is_completed: bool,
    jackpot_amount: String,
    ticket_price: String,
    #[serde(default)]
    participant_count: u64,
    #[serde(default)]
    winning_numbers: Option<[u8; 6]>,
    #[serde(default)]
    winner_address: Option<String>,
    #[serde(default)]
    prize_amount: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
}

impl MirrorDraw {
    /// Identity always comes from the request, not the payload. A mirror
    /// that echoes the wrong ids must not poison the cache key space.
    fn into_draw(self, series_index: u64, draw_id: u64) -> LotteryDraw {
        LotteryDraw {
            id: LotteryDraw::composite_id(series_index, draw_id),
            draw_id,
            series_index,
            series_name: self.series_name,
            start_time: self.start_time,
            end_time: self.end_time,
            is_completed: self.is_completed,
            jackpot_amount: self.jackpot_amount,
            ticket_price: self.ticket_price,
            participant_count: self.participant_count,
            winning_numbers: self.winning_numbers,
            winner_address: self.winner_address,
            prize_amount: self.prize_amount,
            transaction_hash: self.transaction_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorTicket {
    ticket_id: u64,
    wallet_address: String,
    numbers: [u8; 5],
    lotto_number: u8,
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    is_winner: Option<bool>,
}

impl MirrorTicket {
    fn into_ticket(self, series_index: u64, draw_id: u64) -> LotteryTicket {
        LotteryTicket {
            ticket_id: self.ticket_id,
            wallet_address: self.wallet_address.to_lowercase(),
            numbers: self.numbers,
            lotto_number: self.lotto_number,
            timestamp: self.timestamp,
            draw_id,
            series_index,
            is_winner: self.is_winner,
        }
    }
}

// ---------------------------------------------------------------------------
// Test mock
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod testing {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory mirror for orchestrator tests. Empty maps behave like a
    /// cold or absent mirror (every lookup misses).
    #[derive(Default)]
    pub struct MockMirror {
        pub draws: DashMap<(u64, u64), LotteryDraw>,
        pub participants: DashMap<(u64, u64), Vec<LotteryTicket>>,
        pub calls: AtomicUsize,
    }

    impl MockMirror {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MirrorApi for MockMirror {
        async fn draw(&self, series_index: u64, draw_id: u64) -> Option<LotteryDraw> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.draws.get(&(series_index, draw_id)).map(|d| d.clone())
        }

        async fn participants(
            &self,
            series_index: u64,
            draw_id: u64,
        ) -> Option<Vec<LotteryTicket>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.participants
                .get(&(series_index, draw_id))
                .map(|t| t.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_payload_parses_camel_case_and_forces_identity() {
        let json = r#"{
            "drawId": 99,
            "seriesIndex": 42,
            "seriesName": "Weekly Mega",
            "startTime": 1700000000,
            "endTime": 1700600000,
            "isCompleted": true,
            "jackpotAmount": "1250.5",
            "ticketPrice": "0.5",
            "participantCount": 37,
            "winningNumbers": [5, 12, 23, 31, 44, 9],
            "winnerAddress": "0xAbc",
            "prizeAmount": "625.25",
            "transactionHash": "0xdeadbeef"
        }"#;
        let dto: MirrorDraw = serde_json::from_str(json).unwrap();
        let draw = dto.into_draw(3, 7);

        // Request identity wins over whatever the payload claimed.
        assert_eq!(draw.id, "3-7");
        assert_eq!(draw.series_index, 3);
        assert_eq!(draw.draw_id, 7);
        assert_eq!(draw.jackpot_amount, "1250.5");
        assert_eq!(draw.winning_numbers, Some([5, 12, 23, 31, 44, 9]));
        assert_eq!(draw.transaction_hash.as_deref(), Some("0xdeadbeef"));
    }

    #[test]
    fn sparse_draw_payload_fills_defaults() {
        let json = r#"{
            "startTime": 1700000000,
            "endTime": 1700600000,
            "jackpotAmount": "10",
            "ticketPrice": "1"
        }"#;
        let dto: MirrorDraw = serde_json::from_str(json).unwrap();
        let draw = dto.into_draw(0, 1);

        assert!(!draw.is_completed);
        assert_eq!(draw.participant_count, 0);
        assert!(draw.winning_numbers.is_none());
        assert!(draw.transaction_hash.is_none());
    }

    #[test]
    fn ticket_payload_lowercases_wallets() {
        let json = r#"[{
            "ticketId": 4,
            "walletAddress": "0xABCDEF0000000000000000000000000000000001",
            "numbers": [1, 2, 3, 4, 5],
            "lottoNumber": 6,
            "timestamp": 1700100000
        }]"#;
        let dtos: Vec<MirrorTicket> = serde_json::from_str(json).unwrap();
        let ticket = dtos.into_iter().next().unwrap().into_ticket(2, 9);

        assert_eq!(
            ticket.wallet_address,
            "0xabcdef0000000000000000000000000000000001"
        );
        assert_eq!(ticket.series_index, 2);
        assert_eq!(ticket.draw_id, 9);
        assert!(ticket.is_winner.is_none());
    }
}

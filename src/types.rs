use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub index: u64,
    pub name: String,
    /// Draw ids belonging to this series, in contract order.
    pub draw_ids: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryDraw {
    /// Composite identity, `{series_index}-{draw_id}`.
    pub id: String,
    pub draw_id: u64,
    pub series_index: u64,
    pub series_name: String,
    /// Unix seconds.
    pub start_time: u64,
    pub end_time: u64,
    pub is_completed: bool,
    /// Decimal string in whole-token units, e.g. "1250.5".
    pub jackpot_amount: String,
    pub ticket_price: String,
    pub participant_count: u64,
    /// Five main numbers plus the lotto number, present once completed.
    pub winning_numbers: Option<[u8; 6]>,
    pub winner_address: Option<String>,
    pub prize_amount: Option<String>,
    /// Settlement transaction hash. Only the mirror API carries this;
    /// chain-sourced draws leave it unset.
    pub transaction_hash: Option<String>,
}

impl LotteryDraw {
    pub fn composite_id(series_index: u64, draw_id: u64) -> String {
        format!("{series_index}-{draw_id}")
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryTicket {
    pub ticket_id: u64,
    /// Lowercased 0x-hex so one wallet never splits across cache entries.
    pub wallet_address: String,
    pub numbers: [u8; 5],
    pub lotto_number: u8,
    /// Purchase time, unix seconds.
    pub timestamp: u64,
    pub draw_id: u64,
    pub series_index: u64,
    /// None until the draw completes and winning numbers are known.
    pub is_winner: Option<bool>,
}

impl LotteryTicket {
    /// Element-wise match against a completed draw's numbers. The contract
    /// stores main numbers in drawn order, so position matters.
    pub fn matches_winning(&self, winning: &[u8; 6]) -> bool {
        self.numbers[..] == winning[..5] && self.lotto_number == winning[5]
    }
}

// ---------------------------------------------------------------------------
// Fetch plumbing
// ---------------------------------------------------------------------------

/// Which tier actually produced a value. Drives TTL choice and latency
/// attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Mirror,
    Chain,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataSource::Cache => "cache",
            DataSource::Mirror => "mirror",
            DataSource::Chain => "chain",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Skip the cache read; the fresh result still lands in the cache.
    pub force_refresh: bool,
    /// Cooperative abort, checked at tier boundaries. A cancelled fetch
    /// clears its loading flag and records no error state.
    pub cancel: CancellationToken,
}

impl FetchOptions {
    pub fn force() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

pub const SERIES_LIST_KEY: &str = "series_list";

pub fn series_key(series_index: u64) -> String {
    format!("series_{series_index}")
}

pub fn draw_key(series_index: u64, draw_id: u64) -> String {
    format!("draw_{series_index}_{draw_id}")
}

pub fn participants_key(series_index: u64, draw_id: u64) -> String {
    format!("participants_{series_index}_{draw_id}")
}

pub fn user_tickets_key(series_index: u64, draw_id: u64, wallet_address: &str) -> String {
    format!(
        "user_tickets_{series_index}_{draw_id}_{}",
        wallet_address.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(numbers: [u8; 5], lotto_number: u8) -> LotteryTicket {
        LotteryTicket {
            ticket_id: 1,
            wallet_address: "0xabc".to_string(),
            numbers,
            lotto_number,
            timestamp: 0,
            draw_id: 7,
            series_index: 1,
            is_winner: None,
        }
    }

    #[test]
    fn winning_match_is_positional() {
        let winning = [5, 12, 23, 31, 44, 9];
        assert!(ticket([5, 12, 23, 31, 44], 9).matches_winning(&winning));
        // Same numbers, different order: not a win.
        assert!(!ticket([12, 5, 23, 31, 44], 9).matches_winning(&winning));
        // Lotto number must match too.
        assert!(!ticket([5, 12, 23, 31, 44], 8).matches_winning(&winning));
    }

    #[test]
    fn user_ticket_keys_normalize_address_case() {
        assert_eq!(
            user_tickets_key(2, 10, "0xAbCd"),
            user_tickets_key(2, 10, "0xabcd")
        );
        assert_eq!(user_tickets_key(2, 10, "0xAbCd"), "user_tickets_2_10_0xabcd");
    }
}

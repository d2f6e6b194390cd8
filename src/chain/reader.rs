use std::sync::Arc;

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};
use tracing::warn;

use crate::chain::contract::LotteryContract;
use crate::error::{AppError, Result};
use crate::types::{LotteryDraw, LotteryTicket, SeriesInfo};

/// Normalization layer over the raw contract: base-unit amounts become
/// decimal strings, `U256` counters become `u64`, tuples become entities.
/// Auxiliary fields degrade to defaults instead of failing a snapshot:
/// winning numbers on an open draw are legitimately absent, and a flaky
/// ticket counter must not blank an otherwise good draw.
pub struct ChainReader<C> {
    contract: Arc<C>,
}

impl<C: LotteryContract> ChainReader<C> {
    pub fn new(contract: Arc<C>) -> Self {
        Self { contract }
    }

    pub async fn series_count(&self) -> Result<u64> {
        Ok(u256_to_u64(self.contract.total_series().await?))
    }

    /// The name call is the one hard requirement (a series without identity
    /// is unusable); a failed draw-id enumeration degrades to an empty list.
    pub async fn series_info(&self, series_index: u64) -> Result<SeriesInfo> {
        let name = self.contract.series_name(series_index).await?;
        let draw_ids = match self.contract.series_draw_ids(series_index).await {
            Ok(ids) => ids.into_iter().map(u256_to_u64).collect(),
            Err(e) => {
                warn!("[CHAIN] draw-id enumeration failed for series {series_index}: {e}");
                Vec::new()
            }
        };
        Ok(SeriesInfo {
            index: series_index,
            name,
            draw_ids,
        })
    }

    /// Assemble a full draw entity. Only the core scalar call can fail the
    /// snapshot; ticket count, winning numbers and winner all degrade with
    /// a warning. Completion-gated calls are skipped on open draws so an
    /// active-draw snapshot costs two RPCs, not five.
    pub async fn draw_snapshot(
        &self,
        series_index: u64,
        series_name: &str,
        draw_id: u64,
    ) -> Result<LotteryDraw> {
        let details = self.contract.draw_details(draw_id).await?;

        let participant_count = match self.contract.total_tickets_sold(draw_id).await {
            Ok(n) => u256_to_u64(n),
            Err(e) => {
                warn!("[CHAIN] ticket count unavailable for draw {draw_id}: {e}");
                0
            }
        };

        let (winning_numbers, winner_address, prize_amount) = if details.is_completed {
            let numbers = match self.contract.winning_numbers(draw_id).await {
                // All zeros means not actually drawn yet.
                Ok(n) if n != [0u8; 6] => Some(n),
                Ok(_) => None,
                Err(e) => {
                    warn!("[CHAIN] winning numbers unavailable for draw {draw_id}: {e}");
                    None
                }
            };
            let (winner, prize) = match self.contract.draw_winner(draw_id).await {
                Ok(w) if w.winner != Address::ZERO => (
                    Some(format!("{:#x}", w.winner)),
                    Some(to_decimal_string(w.prize_amount)),
                ),
                Ok(_) => (None, None),
                Err(e) => {
                    warn!("[CHAIN] winner unavailable for draw {draw_id}: {e}");
                    (None, None)
                }
            };
            (numbers, winner, prize)
        } else {
            (None, None, None)
        };

        Ok(LotteryDraw {
            id: LotteryDraw::composite_id(series_index, draw_id),
            draw_id,
            series_index,
            series_name: series_name.to_string(),
            start_time: u256_to_u64(details.start_time),
            end_time: u256_to_u64(details.end_time),
            is_completed: details.is_completed,
            jackpot_amount: to_decimal_string(details.jackpot_amount),
            ticket_price: to_decimal_string(details.ticket_price),
            participant_count,
            winning_numbers,
            winner_address,
            prize_amount,
            transaction_hash: None,
        })
    }

    pub async fn ticket_count(&self, draw_id: u64) -> Result<u64> {
        Ok(u256_to_u64(self.contract.total_tickets_sold(draw_id).await?))
    }

    /// One participant ticket. The ticket id of a draw-wide enumeration is
    /// its index; `is_winner` stays unset here (marking needs the draw's
    /// winning numbers, which the caller holds).
    pub async fn ticket(
        &self,
        series_index: u64,
        draw_id: u64,
        ticket_index: u64,
    ) -> Result<LotteryTicket> {
        let raw = self.contract.ticket_details(draw_id, ticket_index).await?;
        Ok(LotteryTicket {
            ticket_id: ticket_index,
            wallet_address: format!("{:#x}", raw.player),
            numbers: raw.numbers,
            lotto_number: raw.lotto_number,
            timestamp: u256_to_u64(raw.purchase_time),
            draw_id,
            series_index,
            is_winner: None,
        })
    }

    pub async fn user_ticket_count(&self, user: Address, draw_id: u64) -> Result<u64> {
        Ok(u256_to_u64(
            self.contract.user_tickets_count(user, draw_id).await?,
        ))
    }

    pub async fn user_ticket(
        &self,
        user: Address,
        series_index: u64,
        draw_id: u64,
        ticket_index: u64,
    ) -> Result<LotteryTicket> {
        let raw = self
            .contract
            .user_ticket_details(user, draw_id, ticket_index)
            .await?;
        Ok(LotteryTicket {
            ticket_id: u256_to_u64(raw.ticket_id),
            wallet_address: format!("{user:#x}"),
            numbers: raw.numbers,
            lotto_number: raw.lotto_number,
            timestamp: u256_to_u64(raw.purchase_time),
            draw_id,
            series_index,
            is_winner: None,
        })
    }
}

/// Parse a user-supplied wallet string. Rejected before any network call.
pub fn parse_wallet(address: &str) -> Result<Address> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|_| AppError::InvalidRequest(format!("invalid wallet address: {address}")))
}

/// Convert an 18-decimal base-unit amount to a human decimal string.
/// `1_500_000_000_000_000_000` → `"1.5"`, `0` → `"0"`.
pub fn to_decimal_string(amount: U256) -> String {
    match format_units(amount, 18) {
        Ok(s) => {
            let trimmed = s.trim_end_matches('0').trim_end_matches('.');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!("[CHAIN] amount formatting failed: {e}");
            amount.to_string()
        }
    }
}

/// Saturating narrow for timestamps and counts.
pub fn u256_to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::contract::testing::MockLottery;
    use crate::chain::contract::{RawDrawDetails, RawDrawWinner, RawTicket};

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000_000u64)
    }

    fn draw_details(is_completed: bool) -> RawDrawDetails {
        RawDrawDetails {
            ticket_price: U256::from(500_000_000_000_000_000u64), // 0.5
            jackpot_amount: eth(1250),
            start_time: U256::from(1_700_000_000u64),
            end_time: U256::from(1_700_600_000u64),
            is_completed,
        }
    }

    #[test]
    fn decimal_strings_trim_trailing_zeros() {
        assert_eq!(to_decimal_string(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(to_decimal_string(eth(2)), "2");
        assert_eq!(to_decimal_string(U256::ZERO), "0");
        assert_eq!(to_decimal_string(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn narrowing_saturates_instead_of_panicking() {
        assert_eq!(u256_to_u64(U256::from(42u64)), 42);
        assert_eq!(u256_to_u64(U256::MAX), u64::MAX);
    }

    #[test]
    fn wallet_parsing_rejects_garbage() {
        assert!(parse_wallet("0x00000000000000000000000000000000000000aa").is_ok());
        assert!(parse_wallet("not-an-address").is_err());
        assert!(parse_wallet("0x1234").is_err());
    }

    #[tokio::test]
    async fn completed_draw_carries_results() {
        let mock = MockLottery::new();
        mock.draws.insert(7, draw_details(true));
        mock.numbers.insert(7, [5, 12, 23, 31, 44, 9]);
        mock.winners.insert(
            7,
            RawDrawWinner {
                winner: Address::repeat_byte(0xab),
                prize_amount: eth(100),
            },
        );
        mock.tickets.insert(
            7,
            vec![RawTicket {
                player: Address::repeat_byte(1),
                numbers: [1, 2, 3, 4, 5],
                lotto_number: 6,
                purchase_time: U256::from(1_700_100_000u64),
            }],
        );

        let reader = ChainReader::new(mock);
        let draw = reader.draw_snapshot(2, "Weekly", 7).await.unwrap();

        assert_eq!(draw.id, "2-7");
        assert_eq!(draw.ticket_price, "0.5");
        assert_eq!(draw.jackpot_amount, "1250");
        assert_eq!(draw.participant_count, 1);
        assert_eq!(draw.winning_numbers, Some([5, 12, 23, 31, 44, 9]));
        assert_eq!(draw.prize_amount.as_deref(), Some("100"));
        assert!(draw.winner_address.is_some());
        assert!(draw.transaction_hash.is_none());
    }

    #[tokio::test]
    async fn open_draw_skips_completion_calls() {
        let mock = MockLottery::new();
        mock.draws.insert(3, draw_details(false));

        let reader = ChainReader::new(Arc::clone(&mock));
        let draw = reader.draw_snapshot(0, "Daily", 3).await.unwrap();

        assert!(!draw.is_completed);
        assert!(draw.winning_numbers.is_none());
        assert!(draw.winner_address.is_none());
        // getDrawDetails + getTotalTicketsSold only.
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn auxiliary_failures_degrade_to_defaults() {
        let mock = MockLottery::new();
        mock.draws.insert(9, draw_details(true));
        mock.fail_numbers.insert(9);
        mock.fail_winner.insert(9);
        mock.fail_sold_count.insert(9);

        let reader = ChainReader::new(mock);
        let draw = reader.draw_snapshot(1, "Weekly", 9).await.unwrap();

        assert!(draw.is_completed);
        assert_eq!(draw.participant_count, 0);
        assert!(draw.winning_numbers.is_none());
        assert!(draw.winner_address.is_none());
        assert!(draw.prize_amount.is_none());
    }

    #[tokio::test]
    async fn zeroed_winning_numbers_read_as_absent() {
        let mock = MockLottery::new();
        mock.draws.insert(4, draw_details(true));
        // No entry in `numbers`: the mock serves [0; 6] like the contract.

        let reader = ChainReader::new(mock);
        let draw = reader.draw_snapshot(0, "Daily", 4).await.unwrap();
        assert!(draw.winning_numbers.is_none());
    }

    #[tokio::test]
    async fn series_enumeration_failure_degrades_to_empty() {
        let mock = MockLottery::new();
        mock.series_names.insert(0, "Genesis".to_string());
        // No draw_ids entry: the enumeration call reverts.

        let reader = ChainReader::new(mock);
        let series = reader.series_info(0).await.unwrap();
        assert_eq!(series.name, "Genesis");
        assert!(series.draw_ids.is_empty());
    }

    #[tokio::test]
    async fn missing_series_name_is_a_hard_error() {
        let mock = MockLottery::new();
        mock.series_names.insert(0, "Genesis".to_string());
        mock.fail_name.insert(1);

        let reader = ChainReader::new(mock);
        assert!(reader.series_info(1).await.is_err());
    }
}

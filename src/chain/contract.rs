//! Raw contract boundary. Everything here speaks ABI types (`U256`,
//! `Address`); normalization into domain entities happens one layer up in
//! the reader. The `LotteryContract` trait exists so tests can substitute
//! call-counting mocks for the live RPC client.

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use async_trait::async_trait;

use crate::error::{AppError, Result};

sol! {
    /// Read-only surface of the deployed lottery contract.
    #[sol(rpc)]
    interface ILottery {
        /// Number of series created so far; series indices are 0..count-1.
        function getTotalSeries() external view returns (uint256);

        function getSeriesNameByIndex(uint256 seriesIndex) external view returns (string memory);

        function getSeriesDrawIds(uint256 seriesIndex) external view returns (uint256[] memory);

        /// Core per-draw scalars. Amounts are 18-decimal base units.
        function getDrawDetails(uint256 drawId)
            external
            view
            returns (
                uint256 ticketPrice,
                uint256 jackpotAmount,
                uint256 startTime,
                uint256 endTime,
                bool isCompleted
            );

        /// Five main numbers plus the lotto number; all zeros until drawn.
        function getWinningNumbers(uint256 drawId) external view returns (uint8[6] memory);

        function getDrawWinner(uint256 drawId)
            external
            view
            returns (address winner, uint256 prizeAmount);

        function getTotalTicketsSold(uint256 drawId) external view returns (uint256);

        function getTicketDetails(uint256 drawId, uint256 ticketIndex)
            external
            view
            returns (
                address player,
                uint8[5] memory numbers,
                uint8 lottoNumber,
                uint256 purchaseTime
            );

        function getUserTicketsCount(address user, uint256 drawId) external view returns (uint256);

        function getUserTicketDetails(address user, uint256 drawId, uint256 ticketIndex)
            external
            view
            returns (
                uint256 ticketId,
                uint8[5] memory numbers,
                uint8 lottoNumber,
                uint256 purchaseTime
            );
    }
}

// ---------------------------------------------------------------------------
// Raw call results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RawDrawDetails {
    pub ticket_price: U256,
    pub jackpot_amount: U256,
    pub start_time: U256,
    pub end_time: U256,
    pub is_completed: bool,
}

#[derive(Debug, Clone)]
pub struct RawDrawWinner {
    pub winner: Address,
    pub prize_amount: U256,
}

#[derive(Debug, Clone)]
pub struct RawTicket {
    pub player: Address,
    pub numbers: [u8; 5],
    pub lotto_number: u8,
    pub purchase_time: U256,
}

#[derive(Debug, Clone)]
pub struct RawUserTicket {
    pub ticket_id: U256,
    pub numbers: [u8; 5],
    pub lotto_number: u8,
    pub purchase_time: U256,
}

// ---------------------------------------------------------------------------
// LotteryContract: the mockable seam
// ---------------------------------------------------------------------------

/// One method per view function. Implementations return errors verbatim;
/// degrade decisions (what a failed auxiliary call means for a snapshot)
/// belong to the reader, not here.
#[async_trait]
pub trait LotteryContract: Send + Sync {
    async fn total_series(&self) -> Result<U256>;
    async fn series_name(&self, series_index: u64) -> Result<String>;
    async fn series_draw_ids(&self, series_index: u64) -> Result<Vec<U256>>;
    async fn draw_details(&self, draw_id: u64) -> Result<RawDrawDetails>;
    async fn winning_numbers(&self, draw_id: u64) -> Result<[u8; 6]>;
    async fn draw_winner(&self, draw_id: u64) -> Result<RawDrawWinner>;
    async fn total_tickets_sold(&self, draw_id: u64) -> Result<U256>;
    async fn ticket_details(&self, draw_id: u64, ticket_index: u64) -> Result<RawTicket>;
    async fn user_tickets_count(&self, user: Address, draw_id: u64) -> Result<U256>;
    async fn user_ticket_details(
        &self,
        user: Address,
        draw_id: u64,
        ticket_index: u64,
    ) -> Result<RawUserTicket>;
}

// ---------------------------------------------------------------------------
// EvmLotteryClient: live RPC implementation
// ---------------------------------------------------------------------------

pub struct EvmLotteryClient {
    contract: ILottery::ILotteryInstance<DynProvider>,
}

impl EvmLotteryClient {
    pub fn connect(rpc_url: &str, contract_address: &str) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|_| AppError::Config(format!("invalid RPC_URL: {rpc_url}")))?;
        let address: Address = contract_address.parse().map_err(|_| {
            AppError::Config(format!("invalid CONTRACT_ADDRESS: {contract_address}"))
        })?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            contract: ILottery::new(address, provider),
        })
    }
}

#[async_trait]
impl LotteryContract for EvmLotteryClient {
    async fn total_series(&self) -> Result<U256> {
        Ok(self.contract.getTotalSeries().call().await?)
    }

    async fn series_name(&self, series_index: u64) -> Result<String> {
        Ok(self
            .contract
            .getSeriesNameByIndex(U256::from(series_index))
            .call()
            .await?)
    }

    async fn series_draw_ids(&self, series_index: u64) -> Result<Vec<U256>> {
        Ok(self
            .contract
            .getSeriesDrawIds(U256::from(series_index))
            .call()
            .await?)
    }

    async fn draw_details(&self, draw_id: u64) -> Result<RawDrawDetails> {
        let ret = self.contract.getDrawDetails(U256::from(draw_id)).call().await?;
        Ok(RawDrawDetails {
            ticket_price: ret.ticketPrice,
            jackpot_amount: ret.jackpotAmount,
            start_time: ret.startTime,
            end_time: ret.endTime,
            is_completed: ret.isCompleted,
        })
    }

    async fn winning_numbers(&self, draw_id: u64) -> Result<[u8; 6]> {
        Ok(self
            .contract
            .getWinningNumbers(U256::from(draw_id))
            .call()
            .await?)
    }

    async fn draw_winner(&self, draw_id: u64) -> Result<RawDrawWinner> {
        let ret = self.contract.getDrawWinner(U256::from(draw_id)).call().await?;
        Ok(RawDrawWinner {
            winner: ret.winner,
            prize_amount: ret.prizeAmount,
        })
    }

    async fn total_tickets_sold(&self, draw_id: u64) -> Result<U256> {
        Ok(self
            .contract
            .getTotalTicketsSold(U256::from(draw_id))
            .call()
            .await?)
    }

    async fn ticket_details(&self, draw_id: u64, ticket_index: u64) -> Result<RawTicket> {
        let ret = self
            .contract
            .getTicketDetails(U256::from(draw_id), U256::from(ticket_index))
            .call()
            .await?;
        Ok(RawTicket {
            player: ret.player,
            numbers: ret.numbers,
            lotto_number: ret.lottoNumber,
            purchase_time: ret.purchaseTime,
        })
    }

    async fn user_tickets_count(&self, user: Address, draw_id: u64) -> Result<U256> {
        Ok(self
            .contract
            .getUserTicketsCount(user, U256::from(draw_id))
            .call()
            .await?)
    }

    async fn user_ticket_details(
        &self,
        user: Address,
        draw_id: u64,
        ticket_index: u64,
    ) -> Result<RawUserTicket> {
        let ret = self
            .contract
            .getUserTicketDetails(user, U256::from(draw_id), U256::from(ticket_index))
            .call()
            .await?;
        Ok(RawUserTicket {
            ticket_id: ret.ticketId,
            numbers: ret.numbers,
            lotto_number: ret.lottoNumber,
            purchase_time: ret.purchaseTime,
        })
    }
}

// ---------------------------------------------------------------------------
// Test mock
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod testing {
    use super::*;
    use dashmap::{DashMap, DashSet};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scriptable in-memory contract. Tests seed the maps directly and flip
    /// the `fail_*` switches to make individual calls revert; `calls` counts
    /// every issued call so cache-precedence tests can assert the network
    /// was never touched.
    #[derive(Default)]
    pub struct MockLottery {
        pub series_names: DashMap<u64, String>,
        pub draw_ids: DashMap<u64, Vec<u64>>,
        pub draws: DashMap<u64, RawDrawDetails>,
        pub numbers: DashMap<u64, [u8; 6]>,
        pub winners: DashMap<u64, RawDrawWinner>,
        pub tickets: DashMap<u64, Vec<RawTicket>>,
        pub user_tickets: DashMap<(Address, u64), Vec<RawUserTicket>>,
        pub fail_name: DashSet<u64>,
        pub fail_numbers: DashSet<u64>,
        pub fail_winner: DashSet<u64>,
        pub fail_sold_count: DashSet<u64>,
        pub fail_ticket: DashSet<(u64, u64)>,
        /// Milliseconds every `draw_details` call sleeps before answering.
        /// Lets paused-clock tests observe in-flight state.
        pub delay_ms: AtomicU64,
        pub calls: AtomicUsize,
    }

    impl MockLottery {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn revert(what: &str) -> AppError {
            AppError::Config(format!("mock revert: {what}"))
        }
    }

    #[async_trait]
    impl LotteryContract for MockLottery {
        async fn total_series(&self) -> Result<U256> {
            self.tick();
            Ok(U256::from(self.series_names.len()))
        }

        async fn series_name(&self, series_index: u64) -> Result<String> {
            self.tick();
            if self.fail_name.contains(&series_index) {
                return Err(Self::revert("getSeriesNameByIndex"));
            }
            self.series_names
                .get(&series_index)
                .map(|r| r.clone())
                .ok_or_else(|| Self::revert("unknown series"))
        }

        async fn series_draw_ids(&self, series_index: u64) -> Result<Vec<U256>> {
            self.tick();
            self.draw_ids
                .get(&series_index)
                .map(|ids| ids.iter().map(|&id| U256::from(id)).collect())
                .ok_or_else(|| Self::revert("unknown series"))
        }

        async fn draw_details(&self, draw_id: u64) -> Result<RawDrawDetails> {
            self.tick();
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            self.draws
                .get(&draw_id)
                .map(|r| r.clone())
                .ok_or_else(|| Self::revert("unknown draw"))
        }

        async fn winning_numbers(&self, draw_id: u64) -> Result<[u8; 6]> {
            self.tick();
            if self.fail_numbers.contains(&draw_id) {
                return Err(Self::revert("getWinningNumbers"));
            }
            Ok(self.numbers.get(&draw_id).map(|r| *r).unwrap_or([0; 6]))
        }

        async fn draw_winner(&self, draw_id: u64) -> Result<RawDrawWinner> {
            self.tick();
            if self.fail_winner.contains(&draw_id) {
                return Err(Self::revert("getDrawWinner"));
            }
            Ok(self
                .winners
                .get(&draw_id)
                .map(|r| r.clone())
                .unwrap_or(RawDrawWinner {
                    winner: Address::ZERO,
                    prize_amount: U256::ZERO,
                }))
        }

        async fn total_tickets_sold(&self, draw_id: u64) -> Result<U256> {
            self.tick();
            if self.fail_sold_count.contains(&draw_id) {
                return Err(Self::revert("getTotalTicketsSold"));
            }
            Ok(U256::from(
                self.tickets.get(&draw_id).map(|t| t.len()).unwrap_or(0),
            ))
        }

        async fn ticket_details(&self, draw_id: u64, ticket_index: u64) -> Result<RawTicket> {
            self.tick();
            if self.fail_ticket.contains(&(draw_id, ticket_index)) {
                return Err(Self::revert("getTicketDetails"));
            }
            self.tickets
                .get(&draw_id)
                .and_then(|t| t.get(ticket_index as usize).cloned())
                .ok_or_else(|| Self::revert("unknown ticket"))
        }

        async fn user_tickets_count(&self, user: Address, draw_id: u64) -> Result<U256> {
            self.tick();
            Ok(U256::from(
                self.user_tickets
                    .get(&(user, draw_id))
                    .map(|t| t.len())
                    .unwrap_or(0),
            ))
        }

        async fn user_ticket_details(
            &self,
            user: Address,
            draw_id: u64,
            ticket_index: u64,
        ) -> Result<RawUserTicket> {
            self.tick();
            self.user_tickets
                .get(&(user, draw_id))
                .and_then(|t| t.get(ticket_index as usize).cloned())
                .ok_or_else(|| Self::revert("unknown user ticket"))
        }
    }
}

pub mod contract;
pub mod reader;

pub use contract::{EvmLotteryClient, LotteryContract};
pub use reader::ChainReader;

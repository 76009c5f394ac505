//! The central limit order book: price-time-priority storage and matching.

mod book;
mod error;
mod fees;
mod level;
mod matching;
mod operations;
mod order;
mod snapshot;
mod trade;

pub use book::OrderBook;
pub use error::OrderBookError;
pub use fees::{FeeSchedule, MAKER_FEE_BPS, TAKER_FEE_BPS};
pub use level::PriceLevel;
pub use matching::MarketExecution;
pub use order::{Order, OrderStatus, OrderType, PRICE_SCALE, Price, Side};
pub use snapshot::DepthSnapshot;
pub use trade::{Trade, TradeLog};

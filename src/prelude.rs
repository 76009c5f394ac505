//! Prelude re-exporting the types most integrations need.
//!
//! ```rust
//! use perpbook_rs::prelude::*;
//! ```

pub use crate::config::{Config, ConfigError};
pub use crate::engine::{Engine, SharedEngine};
pub use crate::orderbook::{
    DepthSnapshot, FeeSchedule, MarketExecution, Order, OrderBook, OrderBookError, OrderStatus,
    OrderType, PRICE_SCALE, Price, Side, Trade, TradeLog,
};
pub use crate::position::{Account, Position, PositionError, PositionManager, PositionStatus};
pub use crate::risk::{RiskConfig, run_risk_loop};
pub use crate::server::{AppState, router, serve};
pub use crate::settlement::{
    InstructionSender, OracleCache, SettlementError, SettlementInstruction, SettlementPort,
    SimulatedSettlement, instruction_channel, run_emitter,
};
pub use crate::utils::current_time_millis;

//! Settlement layer integration.
//!
//! The on-chain contract is the custodian of funds; the core only emits
//! instructions toward it through the abstract [`SettlementPort`]. Matching
//! never waits on settlement: instructions flow through an outbox channel
//! drained by [`run_emitter`], which retries failures out of band. Oracle
//! reads are cached with a short TTL by [`OracleCache`].

mod emitter;
mod oracle;
mod port;
mod sim;

pub use emitter::{InstructionReceiver, InstructionSender, instruction_channel, run_emitter};
pub use oracle::OracleCache;
pub use port::{SettlementError, SettlementPort};
pub use sim::{SettlementCall, SimulatedSettlement};

use crate::orderbook::PRICE_SCALE;
use crate::orderbook::{Price, Side};
use uuid::Uuid;

/// Scale factor for funding rates on the settlement wire.
pub const FUNDING_SCALE: f64 = 1e18;

/// Encode a decimal price for the settlement wire.
#[inline]
pub fn scale_price(price: f64) -> u64 {
    (price * PRICE_SCALE as f64).round() as u64
}

/// Encode a margin amount for the settlement wire.
#[inline]
pub fn scale_margin(margin: f64) -> u64 {
    (margin * PRICE_SCALE as f64).round() as u64
}

/// Decode a settlement wire price into its decimal value.
#[inline]
pub fn unscale_price(raw: u64) -> f64 {
    raw as f64 / PRICE_SCALE as f64
}

/// Encode a funding rate for the settlement wire.
#[inline]
pub fn scale_funding(rate: f64) -> i64 {
    (rate * FUNDING_SCALE) as i64
}

/// Decode a settlement wire funding rate.
#[inline]
pub fn unscale_funding(raw: i64) -> f64 {
    raw as f64 / FUNDING_SCALE
}

/// A settlement instruction emitted by the matching path.
///
/// Each instruction carries a fresh [`Uuid`] so retries and failures can be
/// correlated in logs.
#[derive(Debug, Clone)]
pub enum SettlementInstruction {
    /// Request custody of margin for a freshly resting limit order.
    AddLimitOrder {
        /// Correlation id for emitter logging.
        id: Uuid,
        /// Order owner.
        trader: String,
        /// Order side.
        side: Side,
        /// Limit price.
        price: Price,
        /// Order quantity.
        quantity: f64,
        /// Leverage multiplier.
        leverage: u32,
        /// Margin to take into custody.
        margin: f64,
    },
    /// Release the trader's resting limit slot after a cancel.
    CloseLimitOrder {
        /// Correlation id for emitter logging.
        id: Uuid,
        /// Order owner.
        trader: String,
    },
    /// Report a maker fill against the trader's resting limit.
    FillLimitOrder {
        /// Correlation id for emitter logging.
        id: Uuid,
        /// Maker whose resting order was touched.
        trader: String,
        /// Quantity filled.
        quantity: f64,
    },
    /// Open a position for a fully-executed taker.
    OpenPosition {
        /// Correlation id for emitter logging.
        id: Uuid,
        /// Position owner.
        trader: String,
        /// Position side.
        side: Side,
        /// Volume-weighted entry price, decimal in (0, 1).
        entry_price: f64,
        /// Margin backing the position.
        margin: f64,
        /// Leverage multiplier.
        leverage: u32,
    },
    /// Close the taker's opposite open position.
    ClosePosition {
        /// Correlation id for emitter logging.
        id: Uuid,
        /// Position owner.
        trader: String,
        /// Volume-weighted exit price, decimal in (0, 1).
        exit_price: f64,
    },
}

impl SettlementInstruction {
    /// The correlation id of this instruction.
    pub fn id(&self) -> Uuid {
        match self {
            SettlementInstruction::AddLimitOrder { id, .. }
            | SettlementInstruction::CloseLimitOrder { id, .. }
            | SettlementInstruction::FillLimitOrder { id, .. }
            | SettlementInstruction::OpenPosition { id, .. }
            | SettlementInstruction::ClosePosition { id, .. } => *id,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementInstruction::AddLimitOrder { .. } => "add_limit_order",
            SettlementInstruction::CloseLimitOrder { .. } => "close_limit_order",
            SettlementInstruction::FillLimitOrder { .. } => "fill_limit_order",
            SettlementInstruction::OpenPosition { .. } => "open_position",
            SettlementInstruction::ClosePosition { .. } => "close_position",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_scaling_round_trip() {
        assert_eq!(scale_price(0.45), 450_000);
        assert_eq!(unscale_price(450_000), 0.45);
    }

    #[test]
    fn test_margin_scaling() {
        assert_eq!(scale_margin(200.0), 200_000_000);
        assert_eq!(scale_margin(0.5), 500_000);
    }

    #[test]
    fn test_funding_scaling() {
        // 5% premium.
        assert_eq!(scale_funding(0.05), 50_000_000_000_000_000);
        assert_eq!(unscale_funding(50_000_000_000_000_000), 0.05);
        // Discount rates are negative.
        assert!(scale_funding(-0.01) < 0);
    }
}

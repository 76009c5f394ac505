//! Executed trades and the append-only trade log.

use super::order::Side;
use serde::Serialize;

/// A single executed fill between a maker and a taker.
///
/// The execution price is always the maker's limit price. Fees are
/// computed per order as `margin * leverage * rate`; see
/// [`super::FeeSchedule`].
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    /// Execution time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Per-book monotonic trade identifier.
    pub trade_id: u64,
    /// Execution price (the maker's limit price), decimal in (0, 1).
    pub price: f64,
    /// Quantity exchanged.
    pub quantity: f64,
    /// Wallet address of the taker.
    pub taker_id: String,
    /// Wallet address of the maker.
    pub maker_id: String,
    /// Side of the incoming (taker) order.
    pub taker_side: Side,
    /// Fee charged to the taker.
    pub taker_fee: f64,
    /// Fee charged to the maker.
    pub maker_fee: f64,
}

/// Append-only sequence of executed trades.
///
/// Writes are serialized by the engine lock; readers consume the rolling
/// tail for the UI tape and the last price for mark derivation. Nothing is
/// ever deleted.
#[derive(Debug, Default)]
pub struct TradeLog {
    trades: Vec<Trade>,
}

impl TradeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an executed trade.
    pub fn append(&mut self, trade: Trade) {
        debug_assert!(trade.quantity > 0.0);
        self.trades.push(trade);
    }

    /// The last `n` trades, oldest first.
    pub fn tail(&self, n: usize) -> &[Trade] {
        let start = self.trades.len().saturating_sub(n);
        &self.trades[start..]
    }

    /// Price of the most recent trade, if any ever executed.
    pub fn last_price(&self) -> Option<f64> {
        self.trades.last().map(|t| t.price)
    }

    /// Number of trades recorded.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True when no trade has executed yet.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

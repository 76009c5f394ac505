//! The single-writer exchange core.
//!
//! [`Engine`] owns the order book and the position manager and is the only
//! mutation path for either, which is what makes the matching path's
//! book-and-position updates atomic from a reader's point of view. The
//! whole engine sits behind one `parking_lot::RwLock` ([`SharedEngine`]);
//! writers are the HTTP mutation handlers and the risk loop, readers are
//! the snapshot/tape/price queries. No lock is ever held across I/O:
//! settlement instructions leave through the outbox and the oracle is read
//! by the caller before locking.

use crate::orderbook::{
    DepthSnapshot, FeeSchedule, MarketExecution, OrderBook, OrderBookError, Side, Trade,
};
use crate::position::{Position, PositionManager};
use crate::settlement::InstructionSender;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// The engine behind its lock, shared between the server, the risk loop
/// and the keepers.
pub type SharedEngine = Arc<RwLock<Engine>>;

/// Order book and position manager for one market, bound together.
pub struct Engine {
    book: OrderBook,
    positions: PositionManager,
}

impl Engine {
    /// Create an engine for `market` with the default fee schedule.
    pub fn new(market: &str, settlement: InstructionSender) -> Self {
        Self::with_fee_schedule(market, settlement, FeeSchedule::default())
    }

    /// Create an engine with an explicit fee schedule.
    pub fn with_fee_schedule(
        market: &str,
        settlement: InstructionSender,
        fee_schedule: FeeSchedule,
    ) -> Self {
        Self {
            book: OrderBook::with_fee_schedule(market, settlement, fee_schedule),
            positions: PositionManager::new(),
        }
    }

    /// Wrap this engine in its shared lock.
    pub fn shared(self) -> SharedEngine {
        Arc::new(RwLock::new(self))
    }

    /// The market this engine trades.
    pub fn market(&self) -> &str {
        self.book.market()
    }

    /// Read access to the book.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Read access to the position registry.
    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    /// Mutable access to the position registry, for direct position
    /// administration (seeding, manual close) outside the matching path.
    pub fn positions_mut(&mut self) -> &mut PositionManager {
        &mut self.positions
    }

    /// Ensure an account exists; idempotent.
    pub fn register_account(&mut self, address: &str) -> bool {
        self.positions.register_account(address)
    }

    /// Submit a post-only limit order. See [`OrderBook::submit_limit`].
    pub fn submit_limit(
        &mut self,
        trader_id: &str,
        side: Side,
        price: f64,
        quantity: f64,
        leverage: u32,
        margin: f64,
    ) -> Result<u64, OrderBookError> {
        self.book
            .submit_limit(trader_id, side, price, quantity, leverage, margin)
    }

    /// Cancel a resting limit order. See [`OrderBook::cancel_limit`].
    pub fn cancel_limit(
        &mut self,
        trader_id: &str,
        order_id: u64,
        side: Side,
        price: f64,
    ) -> Result<(), OrderBookError> {
        self.book.cancel_limit(trader_id, order_id, side, price)?;
        // Settlement holds one limit slot per trader; with more orders
        // still resting the on-chain slot this cancel frees is ambiguous.
        let still_resting = self.book.resting_orders_of(trader_id);
        if still_resting > 0 {
            warn!(
                trader = trader_id,
                still_resting, "cancel emitted while trader has other resting orders"
            );
        }
        Ok(())
    }

    /// Execute a market order. See [`OrderBook::execute_market`].
    pub fn execute_market(
        &mut self,
        trader_id: &str,
        side: Side,
        quantity: f64,
        leverage: u32,
        margin: f64,
    ) -> Result<MarketExecution, OrderBookError> {
        self.book
            .execute_market(trader_id, side, quantity, leverage, margin, &mut self.positions)
    }

    /// The book-derived perp mark price.
    ///
    /// The last traded price wins regardless of age; with no trade yet the
    /// midpoint of the best bid and ask is used. Returns `None` when the
    /// book offers neither, in which case callers fall back to the oracle
    /// index price.
    pub fn perp_price(&self) -> Option<f64> {
        self.book
            .trades()
            .last_price()
            .or_else(|| self.book.mid_price())
    }

    /// Structural depth snapshot of the book.
    pub fn snapshot(&self) -> DepthSnapshot {
        self.book.snapshot()
    }

    /// The last `n` trades, oldest first.
    pub fn trades_tail(&self, n: usize) -> Vec<Trade> {
        self.book.trades_tail(n)
    }

    /// Open positions of `address` with unrealized PnL refreshed against
    /// `mark`, cloned for the wire.
    pub fn open_positions_refreshed(&mut self, address: &str, mark: f64) -> Vec<Position> {
        self.positions.refresh_open_positions(address, mark)
    }

    /// Refresh unrealized PnL on every open position and collect accounts
    /// breaching the maintenance ratio. See
    /// [`PositionManager::refresh_and_collect_breaches`].
    pub fn sweep_unrealized(&mut self, mark: f64, maintenance_ratio: f64) -> Vec<String> {
        self.positions
            .refresh_and_collect_breaches(mark, maintenance_ratio)
    }

    /// Stamp every open position of `address` as liquidated after
    /// settlement acknowledged the liquidation.
    pub fn mark_liquidated(&mut self, address: &str) -> Vec<u64> {
        self.positions.mark_liquidated(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::instruction_channel;

    fn engine() -> Engine {
        let (tx, _rx) = instruction_channel();
        Engine::new("YES_TARIFF", tx)
    }

    #[test]
    fn test_perp_price_prefers_last_trade() {
        let mut engine = engine();
        engine.register_account("0xmaker");
        engine.register_account("0xtaker");
        engine
            .submit_limit("0xmaker", Side::Sell, 0.40, 1.0, 2, 100.0)
            .unwrap();
        engine
            .submit_limit("0xmaker", Side::Buy, 0.20, 1.0, 2, 100.0)
            .unwrap();
        // Mid while no trade has printed.
        let mid = engine.perp_price().unwrap();
        assert!((mid - 0.30).abs() < 1e-12);

        engine
            .execute_market("0xtaker", Side::Buy, 1.0, 2, 100.0)
            .unwrap();
        // Last trade beats the midpoint from now on.
        assert_eq!(engine.perp_price(), Some(0.40));
    }

    #[test]
    fn test_perp_price_empty_book() {
        let engine = engine();
        assert!(engine.perp_price().is_none());
    }

    #[test]
    fn test_perp_price_needs_both_sides_for_mid() {
        let mut engine = engine();
        engine
            .submit_limit("0xmaker", Side::Buy, 0.20, 1.0, 2, 100.0)
            .unwrap();
        assert!(engine.perp_price().is_none());
    }

    #[test]
    fn test_open_positions_refreshed() {
        let mut engine = engine();
        engine.register_account("0xmaker");
        engine.register_account("0xtaker");
        engine
            .submit_limit("0xmaker", Side::Sell, 0.50, 1.0, 5, 100.0)
            .unwrap();
        engine
            .execute_market("0xtaker", Side::Buy, 1.0, 5, 100.0)
            .unwrap();

        let positions = engine.open_positions_refreshed("0xtaker", 0.55);
        assert_eq!(positions.len(), 1);
        // ((0.55 - 0.50) / 0.50) * 500 = 50
        assert!((positions[0].unrealized_pnl - 50.0).abs() < 1e-9);

        assert!(engine.open_positions_refreshed("0xghost", 0.5).is_empty());
    }
}

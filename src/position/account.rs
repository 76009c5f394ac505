//! Accounts and positions.

use crate::orderbook::Side;
use serde::Serialize;

/// Lifecycle state of a position. Terminal states are retained forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Live exposure.
    Open,
    /// Closed by the owner or by an offsetting fill.
    Closed,
    /// Forcibly closed by the risk loop.
    Liquidated,
}

/// A trader's exposure in one market.
///
/// At most one position per (account, market) is open at a time. PnL uses
/// `margin * leverage` as the notional, tying gains and losses to the
/// capital actually deposited rather than to `quantity * entry`.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    /// Owning account address.
    pub account_id: String,
    /// Monotonic position identifier.
    pub position_id: u64,
    /// Market this position belongs to.
    pub market_id: String,
    /// Long or short.
    pub side: Side,
    /// Volume-weighted entry price, decimal in (0, 1).
    pub entry_price: f64,
    /// Open quantity; zero once closed.
    pub quantity: f64,
    /// Leverage multiplier.
    pub leverage: u32,
    /// Margin backing the position.
    pub margin: f64,
    /// Reserved; 0 until a liquidation-price model lands.
    pub liq_price: f64,
    /// Last computed unrealized PnL against the mark.
    pub unrealized_pnl: f64,
    /// Accumulated realized PnL from closes.
    pub realized_pnl: f64,
    /// Reserved; funding settlement is handled on-chain.
    pub funding_paid: f64,
    /// Lifecycle state.
    pub status: PositionStatus,
    /// Open time in milliseconds since the Unix epoch.
    pub open_timestamp: u64,
    /// Close time; 0 while open.
    pub close_timestamp: u64,
}

impl Position {
    /// True while the position carries live exposure.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Economic size: `margin * leverage`.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.margin * self.leverage as f64
    }

    /// Unrealized PnL of this position at `mark`.
    ///
    /// The price differential is taken in the position's favor direction,
    /// expressed as a fraction of the entry price, and applied to the
    /// notional.
    pub fn unrealized_at(&self, mark: f64) -> f64 {
        let differential = match self.side {
            Side::Buy => mark - self.entry_price,
            Side::Sell => self.entry_price - mark,
        };
        (differential / self.entry_price) * self.notional()
    }

    /// Realized PnL for a close of this position at `close_price`.
    ///
    /// Uses the full notional regardless of the closed quantity; partial
    /// closes therefore realize the same amount as a full close at the
    /// same price.
    pub fn realized_for_close(&self, close_price: f64) -> f64 {
        match self.side {
            Side::Buy => (close_price - self.entry_price) * self.notional(),
            Side::Sell => (self.entry_price - close_price) * self.notional(),
        }
    }
}

/// An account and its lifetime position history.
///
/// Closed and liquidated positions are never removed.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Wallet address.
    pub account_id: String,
    /// Every position ever held, in creation order.
    pub positions: Vec<Position>,
}

impl Account {
    /// Create an account with no history.
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            positions: Vec::new(),
        }
    }

    /// Iterate the open positions of this account.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    /// The open position in `market_id`, if one exists.
    pub fn open_position_in(&self, market_id: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.is_open() && p.market_id == market_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn position(side: Side, entry: f64, margin: f64, leverage: u32) -> Position {
        Position {
            account_id: "0xabc".to_string(),
            position_id: 1,
            market_id: "YES_TARIFF".to_string(),
            side,
            entry_price: entry,
            quantity: 1.0,
            leverage,
            margin,
            liq_price: 0.0,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            funding_paid: 0.0,
            status: PositionStatus::Open,
            open_timestamp: 0,
            close_timestamp: 0,
        }
    }

    #[test]
    fn test_unrealized_long_loss() {
        // Entry 0.50, margin 100, leverage 5; mark 0.42.
        // ((0.42 - 0.50) / 0.50) * 500 = -80.
        let p = position(Side::Buy, 0.50, 100.0, 5);
        assert_relative_eq!(p.unrealized_at(0.42), -80.0, max_relative = 1e-12);
    }

    #[test]
    fn test_unrealized_short_gain() {
        // Short profits when the mark falls.
        let p = position(Side::Sell, 0.50, 100.0, 5);
        assert_relative_eq!(p.unrealized_at(0.42), 80.0, max_relative = 1e-12);
    }

    #[test]
    fn test_realized_long_profit() {
        // Entry 0.25, margin 500, leverage 2, close 0.375:
        // (0.375 - 0.25) * 1000 = 125.
        let p = position(Side::Buy, 0.25, 500.0, 2);
        assert_relative_eq!(p.realized_for_close(0.375), 125.0);
    }

    #[test]
    fn test_realized_short_loss() {
        let p = position(Side::Sell, 0.25, 500.0, 2);
        assert_relative_eq!(p.realized_for_close(0.375), -125.0);
    }

    #[test]
    fn test_open_position_lookup() {
        let mut account = Account::new("0xabc");
        account.positions.push(position(Side::Buy, 0.5, 100.0, 5));
        account.positions[0].market_id = "A".to_string();
        let mut closed = position(Side::Sell, 0.5, 100.0, 5);
        closed.market_id = "B".to_string();
        closed.status = PositionStatus::Closed;
        account.positions.push(closed);

        assert!(account.open_position_in("A").is_some());
        assert!(account.open_position_in("B").is_none());
        assert_eq!(account.open_positions().count(), 1);
    }
}

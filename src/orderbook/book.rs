//! Core order book container.

use super::fees::FeeSchedule;
use super::level::PriceLevel;
use super::order::{Price, Side};
use super::snapshot::DepthSnapshot;
use super::trade::{Trade, TradeLog};
use crate::settlement::InstructionSender;
use std::collections::BTreeMap;

/// A central limit order book for one market.
///
/// Bids and asks are ordered maps from price to a FIFO level, which makes
/// price priority the map order and time priority the queue order. The
/// book owns its orders, price levels and trade log; all mutation happens
/// through the engine's single writer lock, so no interior synchronization
/// is needed here.
///
/// Settlement instructions produced by book operations are pushed into the
/// outbox `settlement` and emitted outside the lock.
pub struct OrderBook {
    market: String,
    pub(super) bids: BTreeMap<Price, PriceLevel>,
    pub(super) asks: BTreeMap<Price, PriceLevel>,
    pub(super) next_order_id: u64,
    pub(super) next_trade_id: u64,
    pub(super) trades: TradeLog,
    pub(super) fee_schedule: FeeSchedule,
    pub(super) settlement: InstructionSender,
}

impl OrderBook {
    /// Create an empty book for `market` with the default fee schedule.
    pub fn new(market: &str, settlement: InstructionSender) -> Self {
        Self::with_fee_schedule(market, settlement, FeeSchedule::default())
    }

    /// Create an empty book with an explicit fee schedule.
    pub fn with_fee_schedule(
        market: &str,
        settlement: InstructionSender,
        fee_schedule: FeeSchedule,
    ) -> Self {
        Self {
            market: market.to_string(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            next_order_id: 0,
            next_trade_id: 0,
            trades: TradeLog::new(),
            fee_schedule,
            settlement,
        }
    }

    /// The market this book trades.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Highest resting bid, if any.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resting ask, if any.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Midpoint of the best bid and ask, when both sides are populated.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.to_decimal() + ask.to_decimal()) / 2.0),
            _ => None,
        }
    }

    /// The trade log owned by this book.
    pub fn trades(&self) -> &TradeLog {
        &self.trades
    }

    /// The last `n` trades, oldest first, cloned for the wire.
    pub fn trades_tail(&self, n: usize) -> Vec<Trade> {
        self.trades.tail(n).to_vec()
    }

    /// Structural depth view: per side, `[price, remaining_quantity]`
    /// rows, bids descending and asks ascending.
    pub fn snapshot(&self) -> DepthSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .map(|(price, level)| (price.to_decimal(), level.total_remaining()))
            .collect();
        let asks = self
            .asks
            .iter()
            .map(|(price, level)| (price.to_decimal(), level.total_remaining()))
            .collect();
        DepthSnapshot { bids, asks }
    }

    /// Number of orders `trader_id` has resting across both sides.
    pub fn resting_orders_of(&self, trader_id: &str) -> usize {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.iter())
            .filter(|order| order.trader_id == trader_id)
            .count()
    }

    /// The side map holding resting orders for `side`.
    pub(super) fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub(super) fn mint_order_id(&mut self) -> u64 {
        self.next_order_id += 1;
        self.next_order_id
    }

    pub(super) fn mint_trade_id(&mut self) -> u64 {
        self.next_trade_id += 1;
        self.next_trade_id
    }
}

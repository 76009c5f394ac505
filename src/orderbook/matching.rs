//! Market-order matching.

use super::book::OrderBook;
use super::error::OrderBookError;
use super::operations::validate_order_inputs;
use super::order::{OrderStatus, Price, Side};
use super::trade::Trade;
use crate::position::PositionManager;
use crate::settlement::SettlementInstruction;
use crate::utils::current_time_millis;
use tracing::trace;
use uuid::Uuid;

/// Outcome of a fully processed market order.
#[derive(Debug, Clone)]
pub struct MarketExecution {
    /// Id minted for the incoming market order.
    pub order_id: u64,
    /// Volume-weighted average fill price.
    pub avg_price: f64,
    /// Total quantity executed.
    pub total_quantity: f64,
    /// Every fill produced, in execution order.
    pub fills: Vec<Trade>,
}

impl OrderBook {
    /// Execute a market order against the resting side.
    ///
    /// Walks the opposite book in price-time priority: a buy consumes asks
    /// in ascending price, a sell consumes bids in descending price, FIFO
    /// within each level. Each maker touch records a trade at the maker's
    /// price, notifies settlement of the fill, and opens or closes the
    /// maker's position. A partially touched maker is removed from the
    /// book entirely, its untouched quantity treated as refunded; the
    /// alternative of reducing it in place and leaving it resting is
    /// deliberately not applied.
    ///
    /// After the walk, the taker is opened (or its opposite position
    /// closed) as a whole at the volume-weighted average price, and a
    /// single settlement instruction is emitted for it.
    ///
    /// Rejections (bad inputs, empty opposing side) happen before any
    /// mutation.
    pub fn execute_market(
        &mut self,
        trader_id: &str,
        side: Side,
        quantity: f64,
        leverage: u32,
        margin: f64,
        positions: &mut PositionManager,
    ) -> Result<MarketExecution, OrderBookError> {
        validate_order_inputs(quantity, leverage, margin)?;

        let opposing_empty = match side {
            Side::Buy => self.asks.is_empty(),
            Side::Sell => self.bids.is_empty(),
        };
        if opposing_empty {
            return Err(OrderBookError::NoBookDepth { side });
        }

        let order_id = self.mint_order_id();
        let market = self.market().to_string();
        let taker_notional = margin * leverage as f64;
        let mut remaining = quantity;
        let mut fills: Vec<Trade> = Vec::new();

        // Level keys are collected up front so fills can mutate the maps.
        let prices: Vec<Price> = match side {
            Side::Buy => self.asks.keys().copied().collect(),
            Side::Sell => self.bids.keys().rev().copied().collect(),
        };

        for price in prices {
            let mut level_exhausted = false;
            while remaining > 0.0 && !level_exhausted {
                let maker = {
                    let book = self.side_mut(side.opposite());
                    let Some(level) = book.get_mut(&price) else {
                        break;
                    };
                    level.pop_front()
                };
                let Some(mut maker) = maker else {
                    level_exhausted = true;
                    continue;
                };

                let maker_remaining = maker.remaining_quantity();
                debug_assert!(maker_remaining > 0.0, "resting order with no quantity");
                let full_fill = remaining >= maker_remaining;
                let fill_quantity = if full_fill { maker_remaining } else { remaining };

                maker.filled_quantity += fill_quantity;
                maker.status = if full_fill {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };

                let trade = Trade {
                    timestamp: current_time_millis(),
                    trade_id: self.mint_trade_id(),
                    price: maker.price.to_decimal(),
                    quantity: fill_quantity,
                    taker_id: trader_id.to_string(),
                    maker_id: maker.trader_id.clone(),
                    taker_side: side,
                    taker_fee: self.fee_schedule.calculate_fee(taker_notional, false),
                    maker_fee: self.fee_schedule.calculate_fee(maker.notional(), true),
                };
                trace!(
                    trade_id = trade.trade_id,
                    price = trade.price,
                    quantity = trade.quantity,
                    maker = %trade.maker_id,
                    taker = %trade.taker_id,
                    "fill"
                );
                self.trades.append(trade.clone());
                fills.push(trade);
                remaining -= fill_quantity;

                self.settlement.send(SettlementInstruction::FillLimitOrder {
                    id: Uuid::new_v4(),
                    trader: maker.trader_id.clone(),
                    quantity: fill_quantity,
                });

                let maker_price = maker.price.to_decimal();
                if positions.has_opposing_position(&maker.trader_id, &market, maker.side) {
                    positions.close_position(&maker.trader_id, &market, fill_quantity, maker_price)?;
                } else {
                    positions.create_position(
                        &maker.trader_id,
                        &market,
                        maker.side,
                        maker_price,
                        fill_quantity,
                        maker.leverage,
                        maker.margin,
                    )?;
                }
                // On a partial touch the maker is already out of the queue;
                // its leftover margin is refunded rather than re-rested.
            }

            let book = self.side_mut(side.opposite());
            if book.get(&price).is_some_and(|level| level.is_empty()) {
                book.remove(&price);
            }
            if remaining <= 0.0 {
                break;
            }
        }

        debug_assert!(!fills.is_empty(), "non-empty book produced no fills");
        let total_quantity: f64 = fills.iter().map(|t| t.quantity).sum();
        let avg_price =
            fills.iter().map(|t| t.price * t.quantity).sum::<f64>() / total_quantity;

        if positions.has_opposing_position(trader_id, &market, side) {
            self.settlement.send(SettlementInstruction::ClosePosition {
                id: Uuid::new_v4(),
                trader: trader_id.to_string(),
                exit_price: avg_price,
            });
            positions.close_position(trader_id, &market, total_quantity, avg_price)?;
        } else {
            self.settlement.send(SettlementInstruction::OpenPosition {
                id: Uuid::new_v4(),
                trader: trader_id.to_string(),
                side,
                entry_price: avg_price,
                margin,
                leverage,
            });
            positions.create_position(
                trader_id,
                &market,
                side,
                avg_price,
                total_quantity,
                leverage,
                margin,
            )?;
        }

        Ok(MarketExecution {
            order_id,
            avg_price,
            total_quantity,
            fills,
        })
    }
}

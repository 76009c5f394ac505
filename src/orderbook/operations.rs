//! Order book operations: submitting and cancelling limit orders.

use super::book::OrderBook;
use super::error::OrderBookError;
use super::level::PriceLevel;
use super::order::{Order, OrderStatus, OrderType, Price, Side};
use crate::settlement::SettlementInstruction;
use crate::utils::current_time_millis;
use tracing::trace;
use uuid::Uuid;

impl OrderBook {
    /// Submit a resting limit order.
    ///
    /// Validates `0 < price < 1` (both ends strict: the underlying is a
    /// probability), `quantity > 0`, `leverage >= 1` and `margin > 0`,
    /// appends the order at the tail of its price level, and emits one
    /// settlement instruction requesting custody of the margin. Returns
    /// the new order's id.
    ///
    /// Limits are post-only: a crossing price is appended and rests until
    /// a market order consumes it. The book never matches on entry.
    pub fn submit_limit(
        &mut self,
        trader_id: &str,
        side: Side,
        price: f64,
        quantity: f64,
        leverage: u32,
        margin: f64,
    ) -> Result<u64, OrderBookError> {
        let price = Price::from_decimal(price)?;
        validate_order_inputs(quantity, leverage, margin)?;

        let order = Order {
            trader_id: trader_id.to_string(),
            order_id: self.mint_order_id(),
            side,
            price,
            quantity,
            filled_quantity: 0.0,
            leverage,
            margin,
            timestamp: current_time_millis(),
            order_type: OrderType::Limit,
            status: OrderStatus::Open,
        };
        let order_id = order.order_id;
        trace!(
            trader = trader_id,
            order_id,
            side = %side,
            price = %price,
            quantity,
            "adding limit order"
        );

        self.settlement.send(SettlementInstruction::AddLimitOrder {
            id: Uuid::new_v4(),
            trader: trader_id.to_string(),
            side,
            price,
            quantity,
            leverage,
            margin,
        });

        self.side_mut(side)
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(order);

        Ok(order_id)
    }

    /// Cancel the resting limit order identified by
    /// `(trader_id, order_id)` at `(side, price)`.
    ///
    /// Removes the level entry when it empties and emits a settlement
    /// cancel instruction. Fails with [`OrderBookError::OrderNotFound`]
    /// when no such order rests, leaving the book unchanged.
    pub fn cancel_limit(
        &mut self,
        trader_id: &str,
        order_id: u64,
        side: Side,
        price: f64,
    ) -> Result<(), OrderBookError> {
        let price = Price::from_decimal(price)?;
        let not_found = || OrderBookError::OrderNotFound {
            trader_id: trader_id.to_string(),
            order_id,
        };

        let book = self.side_mut(side);
        let level = book.get_mut(&price).ok_or_else(not_found)?;
        let mut removed = level.remove(trader_id, order_id).ok_or_else(not_found)?;
        removed.status = OrderStatus::Cancelled;
        if level.is_empty() {
            book.remove(&price);
        }
        trace!(
            trader = trader_id,
            order_id,
            side = %side,
            price = %price,
            "limit order cancelled"
        );

        self.settlement.send(SettlementInstruction::CloseLimitOrder {
            id: Uuid::new_v4(),
            trader: trader_id.to_string(),
        });

        Ok(())
    }
}

pub(super) fn validate_order_inputs(
    quantity: f64,
    leverage: u32,
    margin: f64,
) -> Result<(), OrderBookError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(OrderBookError::InvalidQuantity { value: quantity });
    }
    if leverage < 1 {
        return Err(OrderBookError::InvalidLeverage { value: leverage });
    }
    if !margin.is_finite() || margin <= 0.0 {
        return Err(OrderBookError::InvalidMargin { value: margin });
    }
    Ok(())
}

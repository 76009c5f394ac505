//! FIFO price level.

use super::order::{Order, OrderStatus, Price};
use std::collections::VecDeque;

/// A bucket of resting orders at a single price, in arrival order.
///
/// Time priority within the level is the queue order: new orders are
/// appended at the tail, matching consumes from the head.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Create an empty level for `price`.
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// The price key of this level.
    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Append an order at the tail of the queue.
    ///
    /// Every order in a level must carry the level's price and be in a
    /// resting status; both are bugs in the caller otherwise.
    pub fn push_back(&mut self, order: Order) {
        debug_assert_eq!(order.price, self.price);
        debug_assert!(matches!(
            order.status,
            OrderStatus::Open | OrderStatus::PartiallyFilled
        ));
        self.orders.push_back(order);
    }

    /// Remove and return the oldest resting order.
    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Remove the order uniquely identified by `(trader_id, order_id)`.
    pub fn remove(&mut self, trader_id: &str, order_id: u64) -> Option<Order> {
        let index = self
            .orders
            .iter()
            .position(|o| o.trader_id == trader_id && o.order_id == order_id)?;
        self.orders.remove(index)
    }

    /// Number of resting orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// True when no orders rest at this level.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Aggregate unfilled quantity resting at this level.
    pub fn total_remaining(&self) -> f64 {
        self.orders.iter().map(Order::remaining_quantity).sum()
    }

    /// Iterate resting orders in time priority.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::order::{OrderType, Side};

    fn order(trader: &str, id: u64, quantity: f64) -> Order {
        Order {
            trader_id: trader.to_string(),
            order_id: id,
            side: Side::Sell,
            price: Price::from_decimal(0.4).unwrap(),
            quantity,
            filled_quantity: 0.0,
            leverage: 2,
            margin: 100.0,
            timestamp: 0,
            order_type: OrderType::Limit,
            status: OrderStatus::Open,
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut level = PriceLevel::new(Price::from_decimal(0.4).unwrap());
        level.push_back(order("a", 1, 1.0));
        level.push_back(order("b", 2, 2.0));
        assert_eq!(level.pop_front().unwrap().order_id, 1);
        assert_eq!(level.pop_front().unwrap().order_id, 2);
        assert!(level.pop_front().is_none());
    }

    #[test]
    fn test_remove_by_owner_and_id() {
        let mut level = PriceLevel::new(Price::from_decimal(0.4).unwrap());
        level.push_back(order("a", 1, 1.0));
        level.push_back(order("b", 2, 2.0));
        level.push_back(order("a", 3, 3.0));

        let removed = level.remove("b", 2).unwrap();
        assert_eq!(removed.trader_id, "b");
        assert_eq!(level.len(), 2);
        // Same id under another trader is not a match.
        assert!(level.remove("a", 2).is_none());
    }

    #[test]
    fn test_total_remaining_counts_unfilled() {
        let mut level = PriceLevel::new(Price::from_decimal(0.4).unwrap());
        let mut partial = order("a", 1, 3.0);
        partial.filled_quantity = 1.0;
        partial.status = OrderStatus::PartiallyFilled;
        level.push_back(partial);
        level.push_back(order("b", 2, 2.0));
        assert_eq!(level.total_remaining(), 4.0);
    }
}

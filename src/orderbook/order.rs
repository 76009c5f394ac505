//! Order domain types: sides, statuses and the bounded probability price.

use super::error::OrderBookError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale factor for the integer wire representation of prices and margins.
///
/// A price `p` in the open interval (0, 1) is transmitted to settlement as
/// `round(p * PRICE_SCALE)`, i.e. a value in (0, 1_000_000).
pub const PRICE_SCALE: u64 = 1_000_000;

/// A limit price for a prediction-market perp, stored in micro-units.
///
/// The underlying asset is a probability, so valid prices live strictly
/// inside (0, 1): the raw micro-unit value is strictly inside
/// `(0, PRICE_SCALE)`. Keying price levels by this integer type gives the
/// book strict ordering without floating-point keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    /// Parse a decimal price, rejecting anything outside the open (0, 1)
    /// interval (the endpoints are resolved markets, not tradable prices).
    pub fn from_decimal(value: f64) -> Result<Self, OrderBookError> {
        if !value.is_finite() || value <= 0.0 || value >= 1.0 {
            return Err(OrderBookError::InvalidPrice { value });
        }
        let raw = (value * PRICE_SCALE as f64).round() as u64;
        if raw == 0 || raw >= PRICE_SCALE {
            return Err(OrderBookError::InvalidPrice { value });
        }
        Ok(Self(raw))
    }

    /// The decimal value in (0, 1).
    #[inline]
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// The raw micro-unit value, which is also the settlement wire encoding.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.to_decimal())
    }
}

/// The side of an order or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Buy / long.
    Buy,
    /// Sell / short.
    Sell,
}

impl Side {
    /// The opposite side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// A resting order at a limit price. Post-only in this engine: a
    /// crossing limit is appended, never matched on entry.
    Limit,
    /// An immediate order consuming resting liquidity.
    Market,
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting, nothing filled yet.
    Open,
    /// Some quantity filled, remainder resting or refunded.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Cancelled by the owner.
    Cancelled,
}

/// A trader order.
///
/// Invariants: `filled_quantity <= quantity`; `Open` implies
/// `filled_quantity < quantity`; `Filled` implies
/// `filled_quantity == quantity`.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Wallet address of the order owner.
    pub trader_id: String,
    /// Per-book monotonic identifier.
    pub order_id: u64,
    /// Buy or sell.
    pub side: Side,
    /// Limit price.
    pub price: Price,
    /// Total quantity.
    pub quantity: f64,
    /// Quantity filled so far.
    pub filled_quantity: f64,
    /// Leverage multiplier, at least 1.
    pub leverage: u32,
    /// Margin deposited for this order.
    pub margin: f64,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Limit or market.
    pub order_type: OrderType,
    /// Lifecycle state.
    pub status: OrderStatus,
}

impl Order {
    /// Quantity still resting.
    #[inline]
    pub fn remaining_quantity(&self) -> f64 {
        self.quantity - self.filled_quantity
    }

    /// Economic size of the order: `margin * leverage`.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.margin * self.leverage as f64
    }
}

//! Depth snapshot for market data.

use serde::{Deserialize, Serialize};

/// A structural view of resting depth at a point in time.
///
/// Each row is `[price, aggregated_remaining_quantity]`; bids are ordered
/// descending, asks ascending, so the first row of each side is the best
/// price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid rows, best (highest) first.
    pub bids: Vec<(f64, f64)>,
    /// Ask rows, best (lowest) first.
    pub asks: Vec<(f64, f64)>,
}

impl DepthSnapshot {
    /// Best bid price in this snapshot.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|&(price, _)| price)
    }

    /// Best ask price in this snapshot.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|&(price, _)| price)
    }

    /// Midpoint of the best bid and ask.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Total resting quantity on the bid side.
    pub fn total_bid_quantity(&self) -> f64 {
        self.bids.iter().map(|&(_, quantity)| quantity).sum()
    }

    /// Total resting quantity on the ask side.
    pub fn total_ask_quantity(&self) -> f64 {
        self.asks.iter().map(|&(_, quantity)| quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prices_and_mid() {
        let snapshot = DepthSnapshot {
            bids: vec![(0.30, 1.0), (0.20, 1.0)],
            asks: vec![(0.40, 1.0), (0.50, 1.0)],
        };
        assert_eq!(snapshot.best_bid(), Some(0.30));
        assert_eq!(snapshot.best_ask(), Some(0.40));
        assert_eq!(snapshot.mid_price(), Some(0.35));
    }

    #[test]
    fn test_empty_sides() {
        let snapshot = DepthSnapshot {
            bids: vec![],
            asks: vec![(0.40, 1.0)],
        };
        assert!(snapshot.best_bid().is_none());
        assert_eq!(snapshot.best_ask(), Some(0.40));
        assert!(snapshot.mid_price().is_none());
    }

    #[test]
    fn test_totals() {
        let snapshot = DepthSnapshot {
            bids: vec![(0.30, 1.5), (0.20, 2.5)],
            asks: vec![(0.40, 3.0)],
        };
        assert_eq!(snapshot.total_bid_quantity(), 4.0);
        assert_eq!(snapshot.total_ask_quantity(), 3.0);
    }

    #[test]
    fn test_rows_serialize_as_pairs() {
        let snapshot = DepthSnapshot {
            bids: vec![(0.30, 1.0)],
            asks: vec![],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"bids":[[0.3,1.0]],"asks":[]}"#);
    }
}

//! Position manager error types.

use std::fmt;

/// Errors that can occur while managing accounts and positions.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PositionError {
    /// The trader has never been registered.
    UnknownAccount {
        /// The unregistered address.
        trader_id: String,
    },

    /// No open position exists for the trader in this market.
    NoOpenPosition {
        /// Position owner.
        trader_id: String,
        /// Market queried.
        market_id: String,
    },

    /// A close asked for more quantity than the position holds.
    QuantityExceedsPosition {
        /// Quantity requested to close.
        requested: f64,
        /// Quantity currently open.
        open: f64,
    },
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionError::UnknownAccount { trader_id } => {
                write!(f, "trader {trader_id} is not a registered account")
            }
            PositionError::NoOpenPosition {
                trader_id,
                market_id,
            } => {
                write!(f, "no open position for {trader_id} in {market_id}")
            }
            PositionError::QuantityExceedsPosition { requested, open } => {
                write!(
                    f,
                    "quantity {requested} exceeds open position quantity {open}"
                )
            }
        }
    }
}

impl std::error::Error for PositionError {}

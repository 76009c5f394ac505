//! Fee schedule for maker and taker fees.

use serde::{Deserialize, Serialize};

/// Default maker fee: 2 bps (0.0002).
pub const MAKER_FEE_BPS: i32 = 2;

/// Default taker fee: 6 bps (0.0006).
pub const TAKER_FEE_BPS: i32 = 6;

/// Configurable maker/taker fee schedule.
///
/// Fees are expressed in basis points (1 bps = 0.01% = 0.0001) and applied
/// to the notional of the relevant order, where notional is
/// `margin * leverage`.
///
/// # Examples
///
/// ```
/// use perpbook_rs::orderbook::FeeSchedule;
///
/// let schedule = FeeSchedule::default();
/// // Taker with margin 200 at leverage 5: notional 1000.
/// assert_eq!(schedule.calculate_fee(1000.0, false), 0.6);
/// assert_eq!(schedule.calculate_fee(1000.0, true), 0.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Maker fee in basis points.
    pub maker_fee_bps: i32,
    /// Taker fee in basis points.
    pub taker_fee_bps: i32,
}

impl FeeSchedule {
    /// Create a new fee schedule.
    #[must_use]
    pub fn new(maker_fee_bps: i32, taker_fee_bps: i32) -> Self {
        Self {
            maker_fee_bps,
            taker_fee_bps,
        }
    }

    /// Fee amount for a fill.
    ///
    /// `notional` is the `margin * leverage` of the maker order when
    /// `is_maker` is true, of the taker order otherwise.
    #[must_use]
    #[inline]
    pub fn calculate_fee(&self, notional: f64, is_maker: bool) -> f64 {
        let bps = if is_maker {
            self.maker_fee_bps
        } else {
            self.taker_fee_bps
        };
        notional * bps as f64 / 10_000.0
    }

    /// True when both rates are zero.
    #[must_use]
    #[inline]
    pub fn is_zero_fee(&self) -> bool {
        self.maker_fee_bps == 0 && self.taker_fee_bps == 0
    }

    /// A schedule charging nothing on either side.
    #[must_use]
    pub fn zero_fee() -> Self {
        Self::new(0, 0)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(MAKER_FEE_BPS, TAKER_FEE_BPS)
    }
}

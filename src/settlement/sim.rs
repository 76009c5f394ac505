//! In-process settlement backend.
//!
//! Stands in for the on-chain contracts: holds oracle/perp/funding state in
//! memory and records every write so tests and the development server can
//! observe exactly what the core emitted.

use super::port::{SettlementError, SettlementPort};
use async_trait::async_trait;
use parking_lot::Mutex;

/// A recorded settlement operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementCall {
    /// `open_position` was invoked.
    OpenPosition {
        /// Position owner.
        trader: String,
        /// Scaled margin.
        margin_scaled: u64,
        /// Leverage multiplier.
        leverage: u32,
        /// True for buy.
        direction: bool,
        /// Scaled entry price.
        entry_price_scaled: u64,
    },
    /// `close_position` was invoked.
    ClosePosition {
        /// Position owner.
        trader: String,
        /// Scaled exit price.
        exit_price_scaled: u64,
    },
    /// `add_limit_order` was invoked.
    AddLimitOrder {
        /// Order owner.
        trader: String,
        /// Leverage multiplier.
        leverage: u32,
        /// Scaled margin.
        margin_scaled: u64,
        /// Scaled limit price.
        price_scaled: u64,
        /// Order quantity.
        quantity: f64,
        /// True for buy.
        direction: bool,
    },
    /// `close_limit_order` was invoked.
    CloseLimitOrder {
        /// Order owner.
        trader: String,
    },
    /// `fill_limit_order` was invoked.
    FillLimitOrder {
        /// Maker whose limit was filled.
        trader: String,
        /// Quantity filled.
        quantity: f64,
    },
    /// `liquidate` was invoked.
    Liquidate {
        /// Liquidated account.
        trader: String,
    },
    /// `update_oracle` was invoked.
    UpdateOracle {
        /// Scaled index price.
        price_scaled: u64,
    },
    /// `update_perp` was invoked.
    UpdatePerp {
        /// Scaled perp price.
        price_scaled: u64,
    },
    /// `update_funding` was invoked.
    UpdateFunding {
        /// Scaled funding rate.
        rate_scaled: i64,
    },
}

#[derive(Debug)]
struct SimState {
    oracle_price: u64,
    perp_price: u64,
    funding_rate: i64,
    reject_liquidations: bool,
    calls: Vec<SettlementCall>,
}

/// Simulated settlement contract state.
#[derive(Debug)]
pub struct SimulatedSettlement {
    state: Mutex<SimState>,
}

impl SimulatedSettlement {
    /// Create a backend with a 0.50 index price.
    pub fn new() -> Self {
        Self::with_oracle_price(500_000)
    }

    /// Create a backend seeded with the given scaled index price.
    pub fn with_oracle_price(price_scaled: u64) -> Self {
        Self {
            state: Mutex::new(SimState {
                oracle_price: price_scaled,
                perp_price: price_scaled,
                funding_rate: 0,
                reject_liquidations: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Make subsequent `liquidate` calls fail, for exercising the
    /// rejected-liquidation path.
    pub fn reject_liquidations(&self, reject: bool) {
        self.state.lock().reject_liquidations = reject;
    }

    /// Every recorded call, in invocation order.
    pub fn calls(&self) -> Vec<SettlementCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&SettlementCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: SettlementCall) {
        self.state.lock().calls.push(call);
    }
}

impl Default for SimulatedSettlement {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementPort for SimulatedSettlement {
    async fn open_position(
        &self,
        trader: &str,
        margin_scaled: u64,
        leverage: u32,
        direction: bool,
        entry_price_scaled: u64,
    ) -> Result<(), SettlementError> {
        self.record(SettlementCall::OpenPosition {
            trader: trader.to_string(),
            margin_scaled,
            leverage,
            direction,
            entry_price_scaled,
        });
        Ok(())
    }

    async fn close_position(
        &self,
        trader: &str,
        exit_price_scaled: u64,
    ) -> Result<(), SettlementError> {
        self.record(SettlementCall::ClosePosition {
            trader: trader.to_string(),
            exit_price_scaled,
        });
        Ok(())
    }

    async fn add_limit_order(
        &self,
        trader: &str,
        leverage: u32,
        margin_scaled: u64,
        price_scaled: u64,
        quantity: f64,
        direction: bool,
    ) -> Result<(), SettlementError> {
        self.record(SettlementCall::AddLimitOrder {
            trader: trader.to_string(),
            leverage,
            margin_scaled,
            price_scaled,
            quantity,
            direction,
        });
        Ok(())
    }

    async fn close_limit_order(&self, trader: &str) -> Result<(), SettlementError> {
        self.record(SettlementCall::CloseLimitOrder {
            trader: trader.to_string(),
        });
        Ok(())
    }

    async fn fill_limit_order(&self, trader: &str, quantity: f64) -> Result<(), SettlementError> {
        self.record(SettlementCall::FillLimitOrder {
            trader: trader.to_string(),
            quantity,
        });
        Ok(())
    }

    async fn liquidate(&self, trader: &str) -> Result<(), SettlementError> {
        let reject = {
            let mut state = self.state.lock();
            state.calls.push(SettlementCall::Liquidate {
                trader: trader.to_string(),
            });
            state.reject_liquidations
        };
        if reject {
            return Err(SettlementError::Rejected(format!(
                "liquidation of {trader} rejected"
            )));
        }
        Ok(())
    }

    async fn get_oracle_price(&self) -> Result<u64, SettlementError> {
        Ok(self.state.lock().oracle_price)
    }

    async fn funding_rate_per_second(&self) -> Result<i64, SettlementError> {
        Ok(self.state.lock().funding_rate)
    }

    async fn update_oracle(&self, price_scaled: u64) -> Result<(), SettlementError> {
        let mut state = self.state.lock();
        state.oracle_price = price_scaled;
        state.calls.push(SettlementCall::UpdateOracle { price_scaled });
        Ok(())
    }

    async fn update_perp(&self, price_scaled: u64) -> Result<(), SettlementError> {
        let mut state = self.state.lock();
        state.perp_price = price_scaled;
        state.calls.push(SettlementCall::UpdatePerp { price_scaled });
        Ok(())
    }

    async fn update_funding(&self, rate_scaled: i64) -> Result<(), SettlementError> {
        let mut state = self.state.lock();
        state.funding_rate = rate_scaled;
        state.calls.push(SettlementCall::UpdateFunding { rate_scaled });
        Ok(())
    }
}

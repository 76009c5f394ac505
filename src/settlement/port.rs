//! The abstract settlement port.

use async_trait::async_trait;

/// Failure of a settlement operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettlementError {
    /// The settlement layer actively rejected the operation.
    #[error("settlement rejected: {0}")]
    Rejected(String),

    /// The settlement layer could not be reached.
    #[error("settlement transport failure: {0}")]
    Transport(String),
}

/// RPC surface of the on-chain settlement contracts.
///
/// Prices and margins cross this boundary scaled by
/// [`crate::orderbook::PRICE_SCALE`]; funding rates by
/// [`super::FUNDING_SCALE`]. `direction` encodes the side as the contract
/// expects it: `true` for buy, `false` for sell. The `trader` argument
/// names the account the transaction acts for.
///
/// Implementations may block on I/O; callers must never invoke the port
/// while holding the engine lock.
#[async_trait]
pub trait SettlementPort: Send + Sync {
    /// Open a position for `trader` at the given entry.
    async fn open_position(
        &self,
        trader: &str,
        margin_scaled: u64,
        leverage: u32,
        direction: bool,
        entry_price_scaled: u64,
    ) -> Result<(), SettlementError>;

    /// Close `trader`'s position at the given exit.
    async fn close_position(&self, trader: &str, exit_price_scaled: u64)
    -> Result<(), SettlementError>;

    /// Take custody of margin for a resting limit order.
    async fn add_limit_order(
        &self,
        trader: &str,
        leverage: u32,
        margin_scaled: u64,
        price_scaled: u64,
        quantity: f64,
        direction: bool,
    ) -> Result<(), SettlementError>;

    /// Release `trader`'s resting limit slot.
    async fn close_limit_order(&self, trader: &str) -> Result<(), SettlementError>;

    /// Report a fill against `trader`'s resting limit.
    async fn fill_limit_order(&self, trader: &str, quantity: f64) -> Result<(), SettlementError>;

    /// Liquidate every position of `trader`.
    async fn liquidate(&self, trader: &str) -> Result<(), SettlementError>;

    /// Read the external index price.
    async fn get_oracle_price(&self) -> Result<u64, SettlementError>;

    /// Read the current funding rate per second.
    async fn funding_rate_per_second(&self) -> Result<i64, SettlementError>;

    /// Push a new index price onto the oracle.
    async fn update_oracle(&self, price_scaled: u64) -> Result<(), SettlementError>;

    /// Push the current perp mark price.
    async fn update_perp(&self, price_scaled: u64) -> Result<(), SettlementError>;

    /// Push the current funding rate.
    async fn update_funding(&self, rate_scaled: i64) -> Result<(), SettlementError>;
}

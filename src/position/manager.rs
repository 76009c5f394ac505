//! The position manager: account registry and position lifecycle.

use super::account::{Account, Position, PositionStatus};
use super::error::PositionError;
use crate::orderbook::Side;
use crate::utils::current_time_millis;
use std::collections::HashMap;
use tracing::{info, warn};

/// Registry of trader accounts and their positions.
///
/// Owned by the engine; every mutation happens under the engine lock. The
/// risk loop reads and writes through the same lock discipline as the
/// matching path.
#[derive(Debug, Default)]
pub struct PositionManager {
    accounts: HashMap<String, Account>,
    next_position_id: u64,
}

impl PositionManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure an account exists for `address`. Idempotent; returns true
    /// when the account was created by this call.
    pub fn register_account(&mut self, address: &str) -> bool {
        if self.accounts.contains_key(address) {
            return false;
        }
        self.accounts
            .insert(address.to_string(), Account::new(address));
        info!(trader = address, "account created");
        true
    }

    /// The account for `address`, if registered.
    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Iterate all registered accounts.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// True when `trader_id` holds an open position in `market_id` on the
    /// side opposite to `order_side`.
    ///
    /// This is the taker-aggression test: an incoming order on the
    /// opposite side of live exposure closes rather than opens.
    pub fn has_opposing_position(&self, trader_id: &str, market_id: &str, order_side: Side) -> bool {
        let Some(account) = self.accounts.get(trader_id) else {
            return false;
        };
        account
            .open_positions()
            .any(|p| p.market_id == market_id && p.side != order_side)
    }

    /// Append a new open position for `trader_id`.
    ///
    /// Fails when the account is not registered. A second open position
    /// in the same market (repeated same-side fills) is logged; closes
    /// always target the oldest open position first.
    #[allow(clippy::too_many_arguments)]
    pub fn create_position(
        &mut self,
        trader_id: &str,
        market_id: &str,
        side: Side,
        entry_price: f64,
        quantity: f64,
        leverage: u32,
        margin: f64,
    ) -> Result<u64, PositionError> {
        let account = self
            .accounts
            .get_mut(trader_id)
            .ok_or_else(|| PositionError::UnknownAccount {
                trader_id: trader_id.to_string(),
            })?;

        if account.open_position_in(market_id).is_some() {
            warn!(
                trader = trader_id,
                market = market_id,
                "opening a second position in the same market"
            );
        }

        self.next_position_id += 1;
        let position = Position {
            account_id: trader_id.to_string(),
            position_id: self.next_position_id,
            market_id: market_id.to_string(),
            side,
            entry_price,
            quantity,
            leverage,
            margin,
            liq_price: 0.0,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            funding_paid: 0.0,
            status: PositionStatus::Open,
            open_timestamp: current_time_millis(),
            close_timestamp: 0,
        };
        info!(
            trader = trader_id,
            market = market_id,
            side = %side,
            quantity,
            entry_price,
            position_id = position.position_id,
            "position created"
        );
        account.positions.push(position);
        Ok(self.next_position_id)
    }

    /// Close `quantity` of the trader's open position in `market_id` at
    /// `close_price`, returning the realized PnL of the close.
    ///
    /// A partial close reduces the open quantity; a full close stamps the
    /// close timestamp and transitions to [`PositionStatus::Closed`].
    /// Closing more than is open is rejected before any mutation.
    pub fn close_position(
        &mut self,
        trader_id: &str,
        market_id: &str,
        quantity: f64,
        close_price: f64,
    ) -> Result<f64, PositionError> {
        let account = self
            .accounts
            .get_mut(trader_id)
            .ok_or_else(|| PositionError::UnknownAccount {
                trader_id: trader_id.to_string(),
            })?;

        let position = account
            .positions
            .iter_mut()
            .find(|p| p.is_open() && p.market_id == market_id)
            .ok_or_else(|| PositionError::NoOpenPosition {
                trader_id: trader_id.to_string(),
                market_id: market_id.to_string(),
            })?;

        if quantity > position.quantity {
            return Err(PositionError::QuantityExceedsPosition {
                requested: quantity,
                open: position.quantity,
            });
        }

        let pnl = position.realized_for_close(close_price);
        position.realized_pnl += pnl;

        if quantity < position.quantity {
            position.quantity -= quantity;
        } else {
            position.quantity = 0.0;
            position.status = PositionStatus::Closed;
            position.close_timestamp = current_time_millis();
        }
        info!(
            trader = trader_id,
            market = market_id,
            quantity,
            close_price,
            pnl,
            "position closed"
        );
        Ok(pnl)
    }

    /// Refresh the stored unrealized PnL of the trader's open position in
    /// `market_id` against `mark`, returning the new value.
    pub fn update_unrealized_pnl(
        &mut self,
        trader_id: &str,
        market_id: &str,
        mark: f64,
    ) -> Result<f64, PositionError> {
        let account = self
            .accounts
            .get_mut(trader_id)
            .ok_or_else(|| PositionError::UnknownAccount {
                trader_id: trader_id.to_string(),
            })?;
        let position = account
            .positions
            .iter_mut()
            .find(|p| p.is_open() && p.market_id == market_id)
            .ok_or_else(|| PositionError::NoOpenPosition {
                trader_id: trader_id.to_string(),
                market_id: market_id.to_string(),
            })?;

        let pnl = position.unrealized_at(mark);
        position.unrealized_pnl = pnl;
        Ok(pnl)
    }

    /// Refresh unrealized PnL on every open position of `address` against
    /// `mark`, returning the refreshed positions cloned.
    pub fn refresh_open_positions(&mut self, address: &str, mark: f64) -> Vec<Position> {
        let Some(account) = self.accounts.get_mut(address) else {
            return Vec::new();
        };
        let mut refreshed = Vec::new();
        for position in account.positions.iter_mut().filter(|p| p.is_open()) {
            position.unrealized_pnl = position.unrealized_at(mark);
            refreshed.push(position.clone());
        }
        refreshed
    }

    /// Refresh unrealized PnL on every open position against `mark` and
    /// collect the accounts whose loss ratio breaches `maintenance_ratio`
    /// (e.g. -0.80).
    ///
    /// A position the arithmetic cannot price (non-finite result) is
    /// logged and skipped; one bad position never aborts the sweep.
    pub fn refresh_and_collect_breaches(
        &mut self,
        mark: f64,
        maintenance_ratio: f64,
    ) -> Vec<String> {
        // Guard so a ratio sitting exactly at the threshold is not tipped
        // over by float noise.
        const RATIO_EPS: f64 = 1e-9;

        let mut breached = Vec::new();
        for account in self.accounts.values_mut() {
            for position in account.positions.iter_mut().filter(|p| p.is_open()) {
                let pnl = position.unrealized_at(mark);
                if !pnl.is_finite() {
                    warn!(
                        trader = %position.account_id,
                        position_id = position.position_id,
                        mark,
                        "skipping position with unpriceable PnL"
                    );
                    continue;
                }
                position.unrealized_pnl = pnl;
                let ratio = pnl / position.margin;
                if ratio < maintenance_ratio - RATIO_EPS
                    && !breached.contains(&position.account_id)
                {
                    breached.push(position.account_id.clone());
                }
            }
        }
        breached
    }

    /// Transition every open position of `address` to
    /// [`PositionStatus::Liquidated`], stamping the close timestamp.
    ///
    /// Called only after the settlement layer acknowledged the
    /// liquidation; returns the ids of the positions stamped.
    pub fn mark_liquidated(&mut self, address: &str) -> Vec<u64> {
        let Some(account) = self.accounts.get_mut(address) else {
            return Vec::new();
        };
        let now = current_time_millis();
        let mut liquidated = Vec::new();
        for position in account.positions.iter_mut().filter(|p| p.is_open()) {
            position.status = PositionStatus::Liquidated;
            position.close_timestamp = now;
            liquidated.push(position.position_id);
            info!(
                trader = address,
                position_id = position.position_id,
                "position liquidated"
            );
        }
        liquidated
    }
}

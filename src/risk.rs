//! The risk & pricing loop.
//!
//! A periodic sweep over every open position: refresh unrealized PnL
//! against the current mark and liquidate accounts whose loss ratio
//! breaches the maintenance threshold. The sweep takes the same engine
//! lock as live trading; the settlement liquidation call happens outside
//! it, and only an acknowledged liquidation transitions position state.

use crate::engine::SharedEngine;
use crate::settlement::{OracleCache, SettlementPort};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Tunables of the risk loop.
#[derive(Debug, Clone, Copy)]
pub struct RiskConfig {
    /// Sweep cadence.
    pub interval: Duration,
    /// Liquidate when `unrealized_pnl / margin` falls below this ratio.
    pub maintenance_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            maintenance_ratio: -0.80,
        }
    }
}

/// Run the periodic sweep until `shutdown` flips to true.
///
/// Cancellation is cooperative: the flag is honored between sweeps, never
/// in the middle of one.
pub async fn run_risk_loop(
    engine: SharedEngine,
    oracle: Arc<OracleCache>,
    port: Arc<dyn SettlementPort>,
    config: RiskConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        sweep_once(&engine, &oracle, port.as_ref(), &config).await;
    }
    debug!("risk loop stopped");
}

/// One full sweep: resolve the mark, refresh PnL, liquidate breaches.
pub async fn sweep_once(
    engine: &SharedEngine,
    oracle: &OracleCache,
    port: &dyn SettlementPort,
    config: &RiskConfig,
) {
    // The oracle is only consulted when the book offers no mark, and
    // always outside the engine lock.
    let book_mark = engine.read().perp_price();
    let mark = match book_mark {
        Some(mark) => mark,
        None => match oracle.index_price().await {
            Ok(index) => index,
            Err(err) => {
                warn!(%err, "risk sweep skipped: no mark available");
                return;
            }
        },
    };

    let breached = engine
        .write()
        .sweep_unrealized(mark, config.maintenance_ratio);
    if breached.is_empty() {
        return;
    }

    for trader in breached {
        match port.liquidate(&trader).await {
            Ok(()) => {
                let positions = engine.write().mark_liquidated(&trader);
                info!(
                    trader = %trader,
                    positions = positions.len(),
                    mark,
                    "account liquidated"
                );
            }
            Err(err) => {
                // Position state stays open; the next sweep retries.
                warn!(trader = %trader, %err, "liquidation rejected by settlement");
            }
        }
    }
}

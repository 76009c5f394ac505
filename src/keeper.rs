//! Keeper tasks.
//!
//! Two background loops keep the settlement layer's pricing state current:
//! the funding keeper derives the funding rate from the perp/index premium
//! on a short cadence, and the oracle keeper pulls an external
//! prediction-market midpoint on a long cadence.

use crate::engine::SharedEngine;
use crate::settlement::{OracleCache, SettlementPort, scale_funding, scale_price};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Base URL of the Polymarket metadata API.
const GAMMA_API: &str = "https://gamma-api.polymarket.com";

/// Base URL of the Polymarket CLOB API.
const CLOB_API: &str = "https://clob.polymarket.com";

/// Failure while reading the external index feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Transport or HTTP status failure.
    #[error("index feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with an unexpected shape.
    #[error("malformed index feed response: {0}")]
    Malformed(String),
}

/// External index price source: the YES-token midpoint of a Polymarket
/// event.
pub struct PolymarketFeed {
    client: reqwest::Client,
    slug: String,
    token_id: tokio::sync::Mutex<Option<String>>,
}

impl PolymarketFeed {
    /// Create a feed for the event identified by `slug`.
    pub fn new(slug: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            slug: slug.to_string(),
            token_id: tokio::sync::Mutex::new(None),
        }
    }

    /// Current midpoint of the YES token, decimal in [0, 1].
    pub async fn midpoint(&self) -> Result<f64, FeedError> {
        let token_id = self.yes_token_id().await?;
        let response: serde_json::Value = self
            .client
            .get(format!("{CLOB_API}/midpoint"))
            .query(&[("token_id", token_id.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mid = &response["mid"];
        mid.as_f64()
            .or_else(|| mid.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| FeedError::Malformed(format!("no usable mid in {response}")))
    }

    /// Resolve (and cache) the event's YES token id.
    async fn yes_token_id(&self) -> Result<String, FeedError> {
        let mut cached = self.token_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let response: serde_json::Value = self
            .client
            .get(format!("{GAMMA_API}/events/slug/{}", self.slug))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // clobTokenIds is a JSON array encoded as a string; the YES token
        // comes first.
        let encoded = response["markets"][0]["clobTokenIds"]
            .as_str()
            .ok_or_else(|| FeedError::Malformed("missing clobTokenIds".to_string()))?;
        let tokens: Vec<String> = serde_json::from_str(encoded)
            .map_err(|err| FeedError::Malformed(format!("bad clobTokenIds: {err}")))?;
        let yes = tokens
            .into_iter()
            .next()
            .ok_or_else(|| FeedError::Malformed("empty clobTokenIds".to_string()))?;

        *cached = Some(yes.clone());
        Ok(yes)
    }
}

/// Push the perp price and funding rate on every cycle.
///
/// The rate is the premium of the perp over the index:
/// `(perp - oracle) / oracle`.
pub async fn run_funding_keeper(
    engine: SharedEngine,
    oracle: Arc<OracleCache>,
    port: Arc<dyn SettlementPort>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
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

        let index = match oracle.index_price().await {
            Ok(index) => index,
            Err(err) => {
                warn!(%err, "funding keeper: index price unavailable");
                continue;
            }
        };
        let perp = engine.read().perp_price().unwrap_or(index);
        let rate = (perp - index) / index;

        if let Err(err) = port.update_perp(scale_price(perp)).await {
            warn!(%err, "funding keeper: perp update failed");
        }
        if let Err(err) = port.update_funding(scale_funding(rate)).await {
            warn!(%err, "funding keeper: funding update failed");
        }
        debug!(perp, index, rate, "funding cycle");
    }
    debug!("funding keeper stopped");
}

/// Push the external midpoint onto the settlement oracle on every cycle.
///
/// Stops for good once the market resolves (midpoint pinned to 0 or 1).
pub async fn run_oracle_keeper(
    feed: PolymarketFeed,
    port: Arc<dyn SettlementPort>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
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

        let price = match feed.midpoint().await {
            Ok(price) => price,
            Err(err) => {
                warn!(%err, "oracle keeper: feed read failed");
                continue;
            }
        };
        if price <= 0.0 || price >= 1.0 {
            info!(price, "market resolved; oracle keeper stopping");
            break;
        }
        if let Err(err) = port.update_oracle(scale_price(price)).await {
            warn!(%err, "oracle keeper: oracle update failed");
        } else {
            debug!(price, "oracle updated");
        }
    }
    debug!("oracle keeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::orderbook::Side;
    use crate::settlement::{SettlementCall, SimulatedSettlement, instruction_channel};

    #[tokio::test(start_paused = true)]
    async fn test_funding_keeper_pushes_premium() {
        let (tx, _rx) = instruction_channel();
        let mut engine = Engine::new("YES_TARIFF", tx);
        // Book mark from the mid: (0.5 + 0.6) / 2 = 0.55.
        engine
            .submit_limit("0xmaker", Side::Buy, 0.5, 1.0, 2, 100.0)
            .unwrap();
        engine
            .submit_limit("0xmaker", Side::Sell, 0.6, 1.0, 2, 100.0)
            .unwrap();
        let engine = engine.shared();

        let sim = Arc::new(SimulatedSettlement::with_oracle_price(500_000));
        let oracle = Arc::new(OracleCache::new(sim.clone(), Duration::from_secs(60)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_funding_keeper(
            engine,
            oracle,
            sim.clone(),
            Duration::from_secs(10),
            shutdown_rx,
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let calls = sim.calls();
        assert!(calls.contains(&SettlementCall::UpdatePerp {
            price_scaled: 550_000
        }));
        // (0.55 - 0.50) / 0.50 = 0.10 premium.
        let funding = calls.iter().find_map(|c| match c {
            SettlementCall::UpdateFunding { rate_scaled } => Some(*rate_scaled),
            _ => None,
        });
        let rate = crate::settlement::unscale_funding(funding.unwrap());
        assert!((rate - 0.10).abs() < 1e-9);
    }
}

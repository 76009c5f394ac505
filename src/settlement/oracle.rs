//! TTL-cached oracle reads.

use super::port::{SettlementError, SettlementPort};
use super::unscale_price;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached view of the external index price.
///
/// The mark-price fallback and the keepers all read the oracle; caching on
/// a short TTL keeps that I/O out of request hot paths and off the engine
/// lock.
pub struct OracleCache {
    port: Arc<dyn SettlementPort>,
    ttl: Duration,
    cached: Mutex<Option<(f64, Instant)>>,
}

impl OracleCache {
    /// Wrap `port` with a cache holding reads for `ttl`.
    pub fn new(port: Arc<dyn SettlementPort>, ttl: Duration) -> Self {
        Self {
            port,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// The decimal index price, served from cache when fresh.
    pub async fn index_price(&self) -> Result<f64, SettlementError> {
        if let Some(price) = self.fresh_cached() {
            return Ok(price);
        }
        let raw = self.port.get_oracle_price().await?;
        let price = unscale_price(raw);
        *self.cached.lock() = Some((price, Instant::now()));
        Ok(price)
    }

    /// Drop the cached value so the next read hits the port.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    fn fresh_cached(&self) -> Option<f64> {
        let cached = self.cached.lock();
        match *cached {
            Some((price, at)) if at.elapsed() < self.ttl => Some(price),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{SettlementCall, SimulatedSettlement};

    #[tokio::test]
    async fn test_cache_serves_within_ttl() {
        let sim = Arc::new(SimulatedSettlement::with_oracle_price(450_000));
        let cache = OracleCache::new(sim.clone(), Duration::from_secs(60));

        assert_eq!(cache.index_price().await.unwrap(), 0.45);
        sim.update_oracle(460_000).await.unwrap();
        // Still cached: no second port read, stale value served.
        assert_eq!(cache.index_price().await.unwrap(), 0.45);
    }

    #[tokio::test]
    async fn test_invalidate_forces_port_read() {
        let sim = Arc::new(SimulatedSettlement::with_oracle_price(450_000));
        let cache = OracleCache::new(sim.clone(), Duration::from_secs(60));

        assert_eq!(cache.index_price().await.unwrap(), 0.45);
        sim.update_oracle(460_000).await.unwrap();
        cache.invalidate();
        assert_eq!(cache.index_price().await.unwrap(), 0.46);
        // Two reads reached the port; the update is also recorded.
        assert_eq!(
            sim.count_calls(|c| matches!(c, SettlementCall::UpdateOracle { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reads_port() {
        let sim = Arc::new(SimulatedSettlement::with_oracle_price(450_000));
        let cache = OracleCache::new(sim.clone(), Duration::ZERO);

        assert_eq!(cache.index_price().await.unwrap(), 0.45);
        sim.update_oracle(470_000).await.unwrap();
        assert_eq!(cache.index_price().await.unwrap(), 0.47);
    }
}

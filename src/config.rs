//! Environment configuration.

use std::time::Duration;

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is present but unparseable.
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Runtime configuration, read from the environment.
///
/// The on-chain connection values (`rpc_url`, `private_key`,
/// `oracle_address`, `perps_address`) are carried for a settlement adapter
/// that signs real transactions; the bundled simulated backend ignores
/// them, so they are optional here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Market traded by this engine instance.
    pub market_name: String,
    /// HTTP bind address, e.g. `127.0.0.1:8000`.
    pub bind_addr: String,
    /// JSON-RPC endpoint of the chain.
    pub rpc_url: Option<String>,
    /// Operator signing key.
    pub private_key: Option<String>,
    /// Oracle contract address.
    pub oracle_address: Option<String>,
    /// Perps contract address.
    pub perps_address: Option<String>,
    /// Risk sweep cadence.
    pub risk_interval: Duration,
    /// Liquidation threshold on `unrealized_pnl / margin`.
    pub maintenance_ratio: f64,
    /// Oracle read cache TTL.
    pub oracle_ttl: Duration,
    /// Funding keeper cadence.
    pub funding_keeper_interval: Duration,
    /// Oracle keeper cadence.
    pub oracle_keeper_interval: Duration,
    /// Prediction-market event slug for the index feed; the oracle keeper
    /// only runs when this is set.
    pub index_feed_slug: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `MARKET_NAME` is required; everything else has a default or is
    /// optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            market_name: require("MARKET_NAME")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            rpc_url: optional("RPC_URL"),
            private_key: optional("PRIVATE_KEY"),
            oracle_address: optional("ORACLE_ADDRESS"),
            perps_address: optional("PERPS_ADDRESS"),
            risk_interval: Duration::from_secs(parse_or("RISK_INTERVAL_SECS", 5)?),
            maintenance_ratio: parse_or_f64("MAINTENANCE_RATIO", -0.80)?,
            oracle_ttl: Duration::from_secs(parse_or("ORACLE_TTL_SECS", 3)?),
            funding_keeper_interval: Duration::from_secs(parse_or(
                "FUNDING_KEEPER_INTERVAL_SECS",
                10,
            )?),
            oracle_keeper_interval: Duration::from_secs(parse_or(
                "ORACLE_KEEPER_INTERVAL_SECS",
                3600,
            )?),
            index_feed_slug: optional("INDEX_FEED_SLUG"),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            value,
        }),
    }
}

fn parse_or_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            value,
        }),
    }
}

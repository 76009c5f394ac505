//! The exchange daemon: engine, HTTP surface, risk loop, emitter and
//! keepers wired together from environment configuration.

use anyhow::Context;
use perpbook_rs::config::Config;
use perpbook_rs::engine::Engine;
use perpbook_rs::keeper::{PolymarketFeed, run_funding_keeper, run_oracle_keeper};
use perpbook_rs::risk::{RiskConfig, run_risk_loop};
use perpbook_rs::server::{AppState, serve};
use perpbook_rs::settlement::{
    OracleCache, SettlementPort, SimulatedSettlement, instruction_channel, run_emitter,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(market = %config.market_name, addr = %config.bind_addr, "starting perpbook");

    // The simulated backend stands in for the on-chain contracts; an RPC
    // adapter would be constructed here from the RPC_URL/key/addresses.
    let port: Arc<dyn SettlementPort> = Arc::new(SimulatedSettlement::new());
    let oracle = Arc::new(OracleCache::new(port.clone(), config.oracle_ttl));

    let (outbox, instructions) = instruction_channel();
    let engine = Engine::new(&config.market_name, outbox).shared();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let emitter = tokio::spawn(run_emitter(instructions, port.clone(), shutdown_rx.clone()));
    let risk = tokio::spawn(run_risk_loop(
        engine.clone(),
        oracle.clone(),
        port.clone(),
        RiskConfig {
            interval: config.risk_interval,
            maintenance_ratio: config.maintenance_ratio,
        },
        shutdown_rx.clone(),
    ));
    let funding_keeper = tokio::spawn(run_funding_keeper(
        engine.clone(),
        oracle.clone(),
        port.clone(),
        config.funding_keeper_interval,
        shutdown_rx.clone(),
    ));
    let oracle_keeper = config.index_feed_slug.as_deref().map(|slug| {
        tokio::spawn(run_oracle_keeper(
            PolymarketFeed::new(slug),
            port.clone(),
            config.oracle_keeper_interval,
            shutdown_rx.clone(),
        ))
    });

    let state = AppState {
        engine,
        oracle,
    };
    let server = tokio::spawn({
        let bind_addr = config.bind_addr.clone();
        async move { serve(state, &bind_addr, shutdown_rx).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutdown requested");
    shutdown_tx.send(true).ok();

    server.await?.context("http surface")?;
    risk.await?;
    funding_keeper.await?;
    if let Some(task) = oracle_keeper {
        task.await?;
    }
    emitter.await?;
    info!("perpbook stopped");
    Ok(())
}

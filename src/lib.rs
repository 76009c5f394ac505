//! # Perpbook: off-chain core for prediction-market perpetual futures
//!
//! An exchange core for perpetual futures whose underlying is a
//! probability, so every price lives strictly inside (0, 1). The crate
//! pairs a price-time-priority central limit order book with a per-trader
//! position manager, derives a perp mark price, and runs a periodic risk
//! sweep that liquidates positions breaching the maintenance threshold.
//! The on-chain settlement layer stays behind an abstract port; the core
//! only emits instructions toward it.
//!
//! ## Components
//!
//! - [`orderbook`]: the book itself, with FIFO price levels on both
//!   sides, post-only limit submission, market-order matching, the
//!   rolling trade log and the maker/taker fee schedule.
//! - [`position`]: account registry and position lifecycle, with PnL
//!   computed against the `margin * leverage` notional.
//! - [`engine`]: binds book and positions behind one writer lock and
//!   derives the mark price (last trade, then midpoint, then oracle).
//! - [`risk`]: the liquidation sweep.
//! - [`settlement`]: the port trait, the fire-and-forget instruction
//!   emitter, a simulated backend and the TTL oracle cache.
//! - [`server`]: the JSON-over-HTTP boundary (axum).
//! - [`keeper`]: funding-rate and oracle updater tasks.
//!
//! ## Example
//!
//! ```
//! use perpbook_rs::engine::Engine;
//! use perpbook_rs::orderbook::Side;
//! use perpbook_rs::settlement::instruction_channel;
//!
//! let (outbox, _instructions) = instruction_channel();
//! let mut engine = Engine::new("YES_TARIFF", outbox);
//! engine.register_account("0xmaker");
//! engine.register_account("0xtaker");
//!
//! engine.submit_limit("0xmaker", Side::Sell, 0.40, 1.0, 5, 100.0).unwrap();
//! let execution = engine.execute_market("0xtaker", Side::Buy, 1.0, 5, 200.0).unwrap();
//! assert_eq!(execution.avg_price, 0.40);
//! assert_eq!(engine.positions().account("0xtaker").unwrap().positions.len(), 1);
//! ```
//!
//! ## Concurrency model
//!
//! The matching core is single-writer: every mutation of the book, the
//! trade log and the positions goes through the engine's write lock, so
//! the observable effects of two orders always land in arrival order.
//! Settlement I/O never happens under the lock: instructions are queued
//! into an outbox and emitted with retries by a background task, and
//! oracle reads are cached on a short TTL.

pub mod config;
pub mod engine;
pub mod keeper;
pub mod orderbook;
pub mod position;
pub mod risk;
pub mod server;
pub mod settlement;

pub mod prelude;
mod utils;

pub use utils::current_time_millis;

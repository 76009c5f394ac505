//! JSON-over-HTTP surface.
//!
//! The sole boundary for traders and UIs: a thin axum adapter over the
//! engine. Handlers validate nothing themselves; they translate between
//! JSON and engine calls and map error values onto status codes
//! (400 validation/state, 422 missing field, 500 unexpected).

mod routes;

pub use routes::PositionView;

use crate::engine::SharedEngine;
use crate::orderbook::OrderBookError;
use crate::position::PositionError;
use crate::settlement::{OracleCache, SettlementError};
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// The exchange core.
    pub engine: SharedEngine,
    /// TTL-cached oracle reads.
    pub oracle: Arc<OracleCache>,
}

/// Build the router for the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/orderbook", get(routes::get_orderbook))
        .route("/positions/{address}", get(routes::get_positions))
        .route("/oracle_price", get(routes::get_oracle_price))
        .route("/perp_price", get(routes::get_perp_price))
        .route("/trades", get(routes::get_trades))
        .route("/tx/limit_order", post(routes::place_limit_order))
        .route("/tx/market_order", post(routes::place_market_order))
        .route("/tx/remove_limit_order", post(routes::remove_limit_order))
        .with_state(state)
}

/// Bind and serve until `shutdown` flips to true.
pub async fn serve(
    state: AppState,
    bind_addr: &str,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "http surface listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Error payload surfaced to HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    /// Caller fault or transient book state; maps to 400.
    BadRequest(String),
    /// Unexpected failure; maps to 500.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<OrderBookError> for ApiError {
    fn from(err: OrderBookError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PositionError> for ApiError {
    fn from(err: PositionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

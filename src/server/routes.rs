//! Route handlers and their wire types.

use super::{ApiError, AppState};
use crate::orderbook::{DepthSnapshot, Side, Trade};
use crate::position::Position;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Trades returned by the rolling tape endpoints.
const TRADE_TAPE_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct LimitOrderRequest {
    trader_address: String,
    direction: Side,
    price: f64,
    quantity: f64,
    leverage: u32,
    margin: f64,
}

#[derive(Debug, Deserialize)]
pub struct MarketOrderRequest {
    trader_address: String,
    direction: Side,
    quantity: f64,
    leverage: u32,
    margin: f64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveOrderRequest {
    trader_address: String,
    order_id: u64,
    direction: Side,
    price: f64,
}

#[derive(Debug, Serialize)]
pub struct LimitOrderResponse {
    status: &'static str,
    order_id: u64,
    orderbook: DepthSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MarketOrderResponse {
    status: &'static str,
    orderbook: DepthSnapshot,
    trades: Vec<Trade>,
}

#[derive(Debug, Serialize)]
pub struct RemoveOrderResponse {
    status: &'static str,
    orderbook: DepthSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    trades: Vec<Trade>,
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    positions: Vec<PositionView>,
}

/// Wire projection of an open position.
#[derive(Debug, Serialize)]
pub struct PositionView {
    /// Monotonic position identifier.
    pub position_id: u64,
    /// Market the position belongs to.
    pub market: String,
    /// "buy" or "sell".
    pub side: Side,
    /// Open quantity.
    pub size: f64,
    /// Entry price.
    pub entry: f64,
    /// Leverage multiplier.
    pub leverage: u32,
    /// Margin backing the position.
    pub margin: f64,
    /// Unrealized PnL at the current mark.
    pub pnl: f64,
    /// Lifecycle state.
    pub status: crate::position::PositionStatus,
}

impl From<Position> for PositionView {
    fn from(p: Position) -> Self {
        Self {
            position_id: p.position_id,
            market: p.market_id,
            side: p.side,
            size: p.quantity,
            entry: p.entry_price,
            leverage: p.leverage,
            margin: p.margin,
            pnl: p.unrealized_pnl,
            status: p.status,
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "perpbook backend running" }))
}

pub async fn get_orderbook(State(state): State<AppState>) -> Json<DepthSnapshot> {
    Json(state.engine.read().snapshot())
}

pub async fn get_positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PositionsResponse>, ApiError> {
    let has_open = state
        .engine
        .read()
        .positions()
        .account(&address)
        .is_some_and(|account| account.open_positions().next().is_some());
    if !has_open {
        return Ok(Json(PositionsResponse { positions: vec![] }));
    }

    let mark = resolve_mark(&state).await?;
    let positions = state
        .engine
        .write()
        .open_positions_refreshed(&address, mark)
        .into_iter()
        .map(PositionView::from)
        .collect();
    Ok(Json(PositionsResponse { positions }))
}

pub async fn get_oracle_price(State(state): State<AppState>) -> Result<Json<f64>, ApiError> {
    Ok(Json(state.oracle.index_price().await?))
}

pub async fn get_perp_price(State(state): State<AppState>) -> Result<Json<f64>, ApiError> {
    Ok(Json(resolve_mark(&state).await?))
}

pub async fn get_trades(State(state): State<AppState>) -> Json<TradesResponse> {
    Json(TradesResponse {
        trades: state.engine.read().trades_tail(TRADE_TAPE_LEN),
    })
}

pub async fn place_limit_order(
    State(state): State<AppState>,
    Json(req): Json<LimitOrderRequest>,
) -> Result<Json<LimitOrderResponse>, ApiError> {
    let mut engine = state.engine.write();
    engine.register_account(&req.trader_address);
    let order_id = engine.submit_limit(
        &req.trader_address,
        req.direction,
        req.price,
        req.quantity,
        req.leverage,
        req.margin,
    )?;
    Ok(Json(LimitOrderResponse {
        status: "ok",
        order_id,
        orderbook: engine.snapshot(),
    }))
}

pub async fn place_market_order(
    State(state): State<AppState>,
    Json(req): Json<MarketOrderRequest>,
) -> Result<Json<MarketOrderResponse>, ApiError> {
    let mut engine = state.engine.write();
    engine.register_account(&req.trader_address);
    engine.execute_market(
        &req.trader_address,
        req.direction,
        req.quantity,
        req.leverage,
        req.margin,
    )?;
    Ok(Json(MarketOrderResponse {
        status: "ok",
        orderbook: engine.snapshot(),
        trades: engine.trades_tail(TRADE_TAPE_LEN),
    }))
}

pub async fn remove_limit_order(
    State(state): State<AppState>,
    Json(req): Json<RemoveOrderRequest>,
) -> Result<Json<RemoveOrderResponse>, ApiError> {
    let mut engine = state.engine.write();
    engine.register_account(&req.trader_address);
    engine.cancel_limit(&req.trader_address, req.order_id, req.direction, req.price)?;
    Ok(Json(RemoveOrderResponse {
        status: "ok",
        orderbook: engine.snapshot(),
    }))
}

/// The perp mark: book-derived when possible, oracle index otherwise.
async fn resolve_mark(state: &AppState) -> Result<f64, ApiError> {
    let book_mark = state.engine.read().perp_price();
    match book_mark {
        Some(mark) => Ok(mark),
        None => Ok(state.oracle.index_price().await?),
    }
}

//! The JSON-over-HTTP surface, exercised through the router.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use perpbook_rs::engine::Engine;
use perpbook_rs::server::{AppState, router};
use perpbook_rs::settlement::{InstructionReceiver, OracleCache, SimulatedSettlement, instruction_channel};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> (Router, InstructionReceiver) {
    let (tx, rx) = instruction_channel();
    let engine = Engine::new(common::MARKET, tx).shared();
    let sim = Arc::new(SimulatedSettlement::new());
    let oracle = Arc::new(OracleCache::new(sim, Duration::from_secs(60)));
    (router(AppState { engine, oracle }), rx)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn limit_order(trader: &str, direction: &str, price: f64, quantity: f64) -> Value {
    json!({
        "trader_address": trader,
        "direction": direction,
        "price": price,
        "quantity": quantity,
        "leverage": 2,
        "margin": 100.0,
    })
}

#[tokio::test]
async fn test_root_health() {
    let (app, _rx) = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_limit_order_round_trip() {
    let (app, _rx) = app();

    let (status, body) = post(&app, "/tx/limit_order", limit_order("0xa", "buy", 0.30, 1.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["order_id"], 1);
    assert_eq!(body["orderbook"]["bids"], json!([[0.3, 1.0]]));

    let (status, book) = get(&app, "/orderbook").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["bids"], json!([[0.3, 1.0]]));
    assert_eq!(book["asks"], json!([]));
}

#[tokio::test]
async fn test_limit_order_validation_maps_to_400() {
    let (app, _rx) = app();
    let (status, body) = post(&app, "/tx/limit_order", limit_order("0xa", "buy", 1.0, 1.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("invalid price"));
}

#[tokio::test]
async fn test_missing_field_maps_to_422() {
    let (app, _rx) = app();
    let (status, _body) = post(
        &app,
        "/tx/limit_order",
        json!({ "trader_address": "0xa", "direction": "buy" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_market_order_without_depth_maps_to_400() {
    let (app, _rx) = app();
    let (status, body) = post(
        &app,
        "/tx/market_order",
        json!({
            "trader_address": "0xbuyer",
            "direction": "buy",
            "quantity": 1.0,
            "leverage": 2,
            "margin": 100.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("no book depth"));
}

#[tokio::test]
async fn test_market_order_returns_book_and_tape() {
    let (app, _rx) = app();
    post(&app, "/tx/limit_order", limit_order("0xmaker", "sell", 0.40, 2.0)).await;

    let (status, body) = post(
        &app,
        "/tx/market_order",
        json!({
            "trader_address": "0xtaker",
            "direction": "buy",
            "quantity": 2.0,
            "leverage": 5,
            "margin": 200.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orderbook"]["asks"], json!([]));
    let trades = body["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], 0.4);
    assert_eq!(trades[0]["taker_id"], "0xtaker");
    assert_eq!(trades[0]["maker_id"], "0xmaker");

    let (_, tape) = get(&app, "/trades").await;
    assert_eq!(tape["trades"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_limit_order() {
    let (app, _rx) = app();
    let (_, body) = post(&app, "/tx/limit_order", limit_order("0xa", "sell", 0.40, 1.0)).await;
    let order_id = body["order_id"].as_u64().unwrap();

    let (status, body) = post(
        &app,
        "/tx/remove_limit_order",
        json!({
            "trader_address": "0xa",
            "order_id": order_id,
            "direction": "sell",
            "price": 0.40,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orderbook"]["asks"], json!([]));
}

#[tokio::test]
async fn test_remove_unknown_order_maps_to_400() {
    let (app, _rx) = app();
    let (status, body) = post(
        &app,
        "/tx/remove_limit_order",
        json!({
            "trader_address": "0xa",
            "order_id": 7,
            "direction": "sell",
            "price": 0.40,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_price_endpoints() {
    let (app, _rx) = app();

    // Empty book: both fall back to the oracle index (0.50).
    let (status, oracle_price) = get(&app, "/oracle_price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(oracle_price, json!(0.5));
    let (_, perp_price) = get(&app, "/perp_price").await;
    assert_eq!(perp_price, json!(0.5));

    // With both sides resting, the perp mark is the midpoint.
    post(&app, "/tx/limit_order", limit_order("0xa", "buy", 0.30, 1.0)).await;
    post(&app, "/tx/limit_order", limit_order("0xb", "sell", 0.40, 1.0)).await;
    let (_, perp_price) = get(&app, "/perp_price").await;
    assert_eq!(perp_price, json!(0.35));
}

#[tokio::test]
async fn test_positions_endpoint_refreshes_pnl() {
    let (app, _rx) = app();
    post(&app, "/tx/limit_order", limit_order("0xmaker", "sell", 0.40, 1.0)).await;
    post(
        &app,
        "/tx/market_order",
        json!({
            "trader_address": "0xtaker",
            "direction": "buy",
            "quantity": 1.0,
            "leverage": 5,
            "margin": 100.0,
        }),
    )
    .await;

    let (status, body) = get(&app, "/positions/0xtaker").await;
    assert_eq!(status, StatusCode::OK);
    let positions = body["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["market"], common::MARKET);
    assert_eq!(positions[0]["side"], "buy");
    assert_eq!(positions[0]["entry"], 0.4);
    assert_eq!(positions[0]["status"], "open");
    // Mark is the last trade (0.40), so the refreshed PnL is flat.
    assert_eq!(positions[0]["pnl"], 0.0);
}

#[tokio::test]
async fn test_positions_endpoint_unknown_address() {
    let (app, _rx) = app();
    let (status, body) = get(&app, "/positions/0xnobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positions"], json!([]));
}

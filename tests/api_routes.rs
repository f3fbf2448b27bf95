//! HTTP surface tests: drive the router with `oneshot` requests.

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use tradex_backend::{
    api::{create_router, AppState},
    auth::AdminToken,
    clock::ManualClock,
    config::AppConfig,
    middleware::Quota,
    store::MemoryKvStore,
    LedgerService,
};

const ADMIN_TOKEN: &str = "test-admin-token";
const ADDRESS: &str = "TXYZabcdefghijkmnopqrstuvwxyz12345";

fn app_with(ip_quota: Quota, admin_token: &str) -> Router {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let store = Arc::new(MemoryKvStore::new(clock.clone()));
    let mut config = AppConfig::default();
    config.ledger.simulation_seed = Some(9);
    let service = Arc::new(LedgerService::new(store, clock, &config));
    create_router(AppState { service }, AdminToken::new(admin_token), ip_quota)
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40_000))))
}

fn app() -> Router {
    app_with(Quota::new(1_000, 60), ADMIN_TOKEN)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_post(uri: &str, body: Value) -> Request<Body> {
    let mut req = post(uri, body);
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {ADMIN_TOKEN}").parse().unwrap(),
    );
    req
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, id: i64) {
    let (status, body) = send(
        app,
        post("/api/user/register", json!({"id": id, "firstName": "Vitalik"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn health_reports_store() {
    let app = app();
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["kv"], "reachable");
}

#[tokio::test]
async fn register_and_read_back() {
    let app = app();
    let (status, body) = send(
        &app,
        post(
            "/api/user/register",
            json!({"userId": 42, "firstName": " Ada ", "languageCode": "fr"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["requestId"].is_string());
    assert_eq!(body["data"]["firstName"], "Ada");
    assert_eq!(body["data"]["balance"], 10.0);

    let (status, body) = send(&app, post("/api/user/register", json!({"id": 42, "firstName": "Ada"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ALREADY_REGISTERED");

    let (status, body) = send(&app, get("/api/user/42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["languageCode"], "fr");

    let (status, body) = send(&app, get("/api/user/43")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, get("/api/user/abc")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_json_is_validation_error() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/deposit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"userId\": 1, \"amount\": "))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn deposit_approval_flow_over_http() {
    let app = app();
    register(&app, 42).await;

    let (status, body) = send(&app, post("/api/deposit", json!({"userId": 42, "amount": 100}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "UNDER_REVIEW");
    assert_eq!(body["data"]["type"], "DEPOSIT");
    let tx_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/user/42/balance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 10.0);

    let decision = json!({"userId": 42, "transactionId": tx_id});
    let (status, body) = send(&app, admin_post("/api/admin/deposit/approve", decision.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["newBalance"], 110.0);

    let (status, body) = send(&app, admin_post("/api/admin/deposit/approve", decision)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_APPROVED");

    let (_, body) = send(&app, get("/api/user/42/balance")).await;
    assert_eq!(body["data"]["balance"], 110.0);
    assert_eq!(body["data"]["breakdown"]["deposits"], 100.0);
}

#[tokio::test]
async fn withdraw_flow_over_http() {
    let app = app();
    register(&app, 7).await;

    let (status, body) = send(
        &app,
        post("/api/withdraw", json!({"userId": 7, "amount": 60, "address": ADDRESS})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");

    let (status, _) = send(
        &app,
        admin_post("/api/admin/user/7/adjust", json!({"newBalance": 500, "reason": "promo"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post("/api/withdraw", json!({"userId": 7, "amount": 60, "address": ADDRESS})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tx_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        admin_post(
            "/api/admin/withdraw/complete",
            json!({"userId": 7, "transactionId": tx_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS");

    let (_, body) = send(
        &app,
        admin_post(
            "/api/admin/withdraw/approve",
            json!({"userId": 7, "transactionId": tx_id}),
        ),
    )
    .await;
    assert_eq!(body["data"]["newBalance"], 440.0);

    let (status, body) = send(
        &app,
        admin_post(
            "/api/admin/withdraw/complete",
            json!({"userId": 7, "transactionId": tx_id, "settlementRef": "0xfeed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["amount"], -60.0);
    assert_eq!(body["data"]["metadata"]["settlementRef"], "0xfeed");

    let (status, body) = send(&app, get("/api/user/7/transactions?type=WITHDRAW")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = send(&app, get("/api/user/7/transactions?sort=sideways")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn trade_over_http() {
    let app = app();
    register(&app, 42).await;

    let (status, body) = send(
        &app,
        post("/api/trade", json!({"userId": 42, "amount": 10, "symbol": "BTC", "side": "BUY", "pnl": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["newBalance"], 15.0);
    assert_eq!(body["data"]["trade"]["pnlUsd"], 5.0);
    assert_eq!(body["data"]["trade"]["symbol"], "BTC");

    let (status, body) = send(
        &app,
        post("/api/trade", json!({"userId": 42, "amount": 10, "symbol": "DOGE"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        post("/api/trade", json!({"userId": 42, "amount": 1, "symbol": "btc", "side": "buy", "pnl": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        admin_post("/api/admin/user/42/status", json!({"status": "blocked"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post("/api/trade", json!({"userId": 42, "amount": 1}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_BLOCKED");
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = app();
    register(&app, 1).await;

    let decision = json!({"userId": 1, "transactionId": "dep_x"});
    let (status, body) = send(&app, post("/api/admin/deposit/approve", decision.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let mut req = post("/api/admin/deposit/approve", decision);
    req.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer wrong".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_locked_without_configured_token() {
    let app = app_with(Quota::new(1_000, 60), "");
    let mut req = post("/api/admin/user/1/adjust", json!({"newBalance": 1}));
    req.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ip_limit_applies_to_api_but_not_health() {
    let app = app_with(Quota::new(2, 60), ADMIN_TOKEN);

    for _ in 0..2 {
        let (status, _) = send(&app, get("/api/user/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let response = app.clone().oneshot(get("/api/user/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("Retry-After"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "RATE_LIMIT");
    assert!(body["resetAt"].is_i64());

    for _ in 0..5 {
        let (status, _) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
    }
}

//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hashrush_node::{MiningConfig, MiningNode, RoundNumber, UserId};
use hashrush_server::{router, AppState, USER_HEADER};
use hashrush_test_helpers::{at, identity, solve};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let node = MiningNode::in_memory(MiningConfig::default());
    router(Arc::new(AppState::with_clock(node, Arc::new(|| at(1_000)))))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<u64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.to_string());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, user: u64) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        Some(user),
        Some(json!({ "identity": identity(UserId(user)) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(&app(), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_user_header_is_rejected() {
    let (status, body) = call(&app(), "POST", "/api/mining/tick", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["reason"], "unauthenticated");
}

#[tokio::test]
async fn test_register_then_mine_a_round() {
    let app = app();
    let account = register(&app, 1).await;
    assert_eq!(account["isNewUser"], true);
    assert!(account["referralCode"].as_str().unwrap().starts_with("XH"));
    register(&app, 2).await;

    let (status, block) = call(&app, "GET", "/api/mining/block", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block["blockNumber"], 1);
    assert_eq!(block["difficulty"], 4);
    assert_eq!(block["status"], "open");

    for user in [1, 2] {
        let (status, joined) = call(
            &app,
            "POST",
            "/api/mining/join",
            Some(user),
            Some(json!({ "mode": "basic" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(joined["mode"]["energyCost"], 100);
    }

    let (status, tick) = call(&app, "POST", "/api/mining/tick", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tick["continue"], true);
    assert_eq!(tick["energy"], 1900);

    let (hash, nonce) = solve(RoundNumber(1), &identity(UserId(1)), 4);
    let (status, receipt) = call(
        &app,
        "POST",
        "/api/mining/submit",
        Some(1),
        Some(json!({ "hash": hash, "nonce": nonce })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["blockNumber"], 1);
    assert_eq!(receipt["finderReward"].as_f64(), Some(500.0));
    assert_eq!(receipt["poolMinersCount"], 1);
    assert_eq!(receipt["totalReward"].as_f64(), Some(1000.0));

    // The same proof again finds the round already settled.
    let (status, body) = call(
        &app,
        "POST",
        "/api/mining/submit",
        Some(1),
        Some(json!({ "hash": hash, "nonce": nonce })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "no_active_round");

    let (_, supply) = call(&app, "GET", "/api/mining/supply", None, None).await;
    assert_eq!(supply["totalMinted"].as_f64(), Some(1000.0));
    assert_eq!(supply["lastBlockNumber"], 1);

    let (_, blocks) = call(&app, "GET", "/api/mining/last-blocks", None, None).await;
    assert_eq!(blocks[0]["blockNumber"], 1);
    assert_eq!(blocks[0]["minedBy"], 1);

    let (_, history) = call(&app, "GET", "/api/mining/history?page=1&limit=5", Some(2), None).await;
    assert_eq!(history["pagination"]["total"], 1);
    assert_eq!(history["entries"][0]["role"], "pool");
}

#[tokio::test]
async fn test_rejections_carry_reasons() {
    let app = app();
    register(&app, 1).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/mining/join",
        Some(1),
        Some(json!({ "mode": "nitro" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "locked");

    let (status, body) = call(&app, "POST", "/api/mining/tick", Some(1), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "not_joined");

    call(&app, "GET", "/api/mining/block", None, None).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/mining/submit",
        Some(1),
        Some(json!({ "hash": "00ff", "nonce": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid");

    let (status, body) = call(&app, "GET", "/api/mining/status", Some(42), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "not_registered");
}

#[tokio::test]
async fn test_shop_and_modes() {
    let app = app();
    register(&app, 1).await;

    let (status, account) = call(
        &app,
        "POST",
        "/api/shop/unlock",
        Some(1),
        Some(json!({ "mode": "turbo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["unlockedModes"], json!(["basic", "turbo"]));

    let (_, account) = call(&app, "POST", "/api/shop/energy-boost", Some(1), None).await;
    assert_eq!(account["energy"], 4000);
    assert_eq!(account["maxEnergy"], 4000);

    let (_, modes) = call(&app, "GET", "/api/mining/modes", Some(1), None).await;
    let unlocked: Vec<_> = modes
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["unlocked"].as_bool().unwrap())
        .collect();
    assert_eq!(unlocked, vec![true, true, false, false]);
}

#[tokio::test]
async fn test_referral_view() {
    let app = app();
    let code = register(&app, 1).await["referralCode"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/register",
        Some(2),
        Some(json!({ "identity": identity(UserId(2)), "referralCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, info) = call(&app, "GET", "/api/referrals", Some(1), None).await;
    assert_eq!(info["referralCode"], code);
    assert_eq!(info["referralCount"], 1);
    assert_eq!(info["referralEarnings"].as_f64(), Some(500.0));
}

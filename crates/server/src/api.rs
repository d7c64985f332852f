//! Routes and handlers.

use crate::{ApiError, AppState, Caller};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use hashrush_node::{
    AccountView, ClosedRoundView, HeartbeatReceipt, HistoryPage, JoinReceipt, MiningStatus,
    ModeView, ReferralView, RoundView, SubmitReceipt, SupplyInfo,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: usize = 20;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the HTTP router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Mining loop
        .route("/api/mining/block", get(current_block))
        .route("/api/mining/join", post(join))
        .route("/api/mining/tick", post(tick))
        .route("/api/mining/submit", post(submit))
        .route("/api/mining/leave", post(leave))
        // Read models
        .route("/api/mining/modes", get(modes))
        .route("/api/mining/status", get(status))
        .route("/api/mining/history", get(history))
        .route("/api/mining/last-blocks", get(last_blocks))
        .route("/api/mining/supply", get(supply))
        // Accounts
        .route("/api/auth/register", post(register))
        .route("/api/referrals", get(referrals))
        .route("/api/shop/unlock", post(unlock_mode))
        .route("/api/shop/energy-boost", post(energy_boost))
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn current_block(State(state): State<Arc<AppState>>) -> ApiResult<RoundView> {
    Ok(Json(state.node.current_round(state.now())?))
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    mode: String,
}

async fn join(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(req): Json<JoinRequest>,
) -> ApiResult<JoinReceipt> {
    Ok(Json(state.node.join(user, &req.mode, state.now())?))
}

async fn tick(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<HeartbeatReceipt> {
    Ok(Json(state.node.heartbeat(user, state.now())?))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    hash: String,
    nonce: u64,
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<SubmitReceipt> {
    if req.hash.trim().is_empty() {
        return Err(ApiError::BadRequest("hash is required".into()));
    }
    Ok(Json(state.node.submit(
        user,
        &req.hash,
        req.nonce,
        state.now(),
    )?))
}

#[derive(Serialize)]
struct Left {
    left: bool,
}

async fn leave(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Left> {
    let left = state.node.leave(user)?;
    Ok(Json(Left { left }))
}

async fn modes(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<Vec<ModeView>> {
    Ok(Json(state.node.modes(user, state.now())?))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<MiningStatus> {
    Ok(Json(state.node.status(user, state.now())?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryPage> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(Json(state.node.history(user, page, limit)?))
}

async fn last_blocks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ClosedRoundView>> {
    Ok(Json(state.node.recent_rounds()?))
}

async fn supply(State(state): State<Arc<AppState>>) -> ApiResult<SupplyInfo> {
    Ok(Json(state.node.supply_info()?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    identity: String,
    referral_code: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AccountView> {
    Ok(Json(state.node.register(
        user,
        &req.identity,
        req.referral_code.as_deref(),
        state.now(),
    )?))
}

async fn referrals(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<ReferralView> {
    Ok(Json(state.node.referral_info(user)?))
}

#[derive(Debug, Deserialize)]
struct UnlockRequest {
    mode: String,
}

async fn unlock_mode(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(req): Json<UnlockRequest>,
) -> ApiResult<AccountView> {
    Ok(Json(state.node.unlock_mode(user, &req.mode)?))
}

async fn energy_boost(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<AccountView> {
    Ok(Json(state.node.boost_energy(user, state.now())?))
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::health::HealthState;
use crate::auction::bids::place_bid;
use crate::auction::settlement::mask_identity;
use crate::auction::sweep::{now_secs, sweep_due, sweep_post};
use crate::db::store;
use crate::error::{AppError, PlaceBidError};
use crate::types::{AuctionStatus, BidAccepted, Notification, SweepReport};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub health: Arc<HealthState>,
    pub notify_tx: mpsc::Sender<Notification>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/auctions/:public_id", get(get_auction))
        .route("/auctions/:public_id/bids", get(get_auction_bids).post(submit_bid))
        .route("/sweep", post(trigger_sweep))
        .route("/sweep/:public_id", post(trigger_sweep_one))
        .route("/downloads/:token", get(resolve_download))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BidRequest {
    pub bidder_phone: String,
    pub display_name: Option<String>,
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct BidHistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AuctionResponse {
    pub public_id: String,
    pub status: AuctionStatus,
    pub auction_ends_at: i64,
    pub current_bid: Option<i64>,
    pub bid_count: i64,
    pub is_exclusive: bool,
    pub exclusive_buyer_name: Option<String>,
    pub sold_at: Option<i64>,
    /// True once the auction ended without an exclusive sale.
    pub can_buy_public: bool,
}

#[derive(Serialize)]
pub struct BidResponse {
    pub bidder: String,
    pub amount: i64,
    pub is_winning: bool,
    pub created_at: i64,
}

#[derive(Serialize)]
pub struct GrantResponse {
    pub post_public_id: String,
    pub remaining_downloads: i64,
    pub expires_at: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_sweep_at: i64,
    pub sweeps_run: u64,
    pub sold_total: u64,
    pub public_sale_total: u64,
    pub failed_total: u64,
}

/// Caller-supplied history limits are clamped to a sane positive range;
/// a negative LIMIT means "no limit" to SQLite.
fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn submit_bid(
    State(state): State<ApiState>,
    Path(public_id): Path<String>,
    Json(req): Json<BidRequest>,
) -> Result<Json<BidAccepted>, PlaceBidError> {
    let accepted = place_bid(
        &state.pool,
        &public_id,
        &req.bidder_phone,
        req.display_name.as_deref(),
        req.amount,
        now_secs(),
    )
    .await?;
    Ok(Json(accepted))
}

async fn get_auction(
    State(state): State<ApiState>,
    Path(public_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(post) = store::fetch_post_by_public_id(&state.pool, &public_id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let status = post.status().unwrap_or(AuctionStatus::Ended);
    let can_buy_public = post.can_buy_public();

    Ok(Json(AuctionResponse {
        public_id: post.public_id,
        status,
        auction_ends_at: post.auction_ends_at,
        current_bid: post.current_bid,
        bid_count: post.bid_count,
        is_exclusive: post.is_exclusive,
        exclusive_buyer_name: post.exclusive_buyer_name,
        sold_at: post.sold_at,
        can_buy_public,
    })
    .into_response())
}

async fn get_auction_bids(
    State(state): State<ApiState>,
    Path(public_id): Path<String>,
    Query(params): Query<BidHistoryQuery>,
) -> Result<Response, AppError> {
    let Some(post) = store::fetch_post_by_public_id(&state.pool, &public_id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let bids = store::fetch_bid_history(&state.pool, post.id, clamp_limit(params.limit)).await?;
    let out: Vec<BidResponse> = bids
        .into_iter()
        .map(|b| BidResponse {
            // Raw identities never leave the service.
            bidder: b
                .bidder_display_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| mask_identity(&b.bidder_identity)),
            amount: b.amount,
            is_winning: b.is_winning,
            created_at: b.created_at,
        })
        .collect();

    Ok(Json(out).into_response())
}

/// Idempotent sweep trigger: processes every eligible post.
async fn trigger_sweep(State(state): State<ApiState>) -> Result<Json<SweepReport>, AppError> {
    let now = now_secs();
    let report = sweep_due(&state.pool, Some(&state.notify_tx), now).await?;
    state.health.record_sweep(&report, now);
    Ok(Json(report))
}

/// Sweep a single post by public id. Unknown posts and posts another
/// caller already claimed both report zero processed.
async fn trigger_sweep_one(
    State(state): State<ApiState>,
    Path(public_id): Path<String>,
) -> Result<Json<SweepReport>, AppError> {
    let now = now_secs();
    let mut report = SweepReport::default();

    if let Some(post) = store::fetch_post_by_public_id(&state.pool, &public_id).await? {
        match sweep_post(&state.pool, Some(&state.notify_tx), post.id, now).await {
            Ok(outcome) => report.record(outcome),
            Err(e) => {
                report.failed += 1;
                tracing::error!(post = %public_id, "Sweep failed: {e}");
            }
        }
    }
    state.health.record_sweep(&report, now);
    Ok(Json(report))
}

/// Download grant resolution for the external download endpoint.
async fn resolve_download(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let Some(grant) = store::fetch_grant_by_token(&state.pool, &token).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if !grant.is_resolvable(now_secs()) {
        return Ok(StatusCode::GONE.into_response());
    }

    let Some(post) = store::fetch_post(&state.pool, grant.post_id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    Ok(Json(GrantResponse {
        post_public_id: post.public_id,
        remaining_downloads: grant.remaining_downloads(),
        expires_at: grant.expires_at,
    })
    .into_response())
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        last_sweep_at: state.health.last_sweep_at(),
        sweeps_run: state.health.sweeps_run(),
        sold_total: state.health.sold_total(),
        public_sale_total: state.health.public_sale_total(),
        failed_total: state.health.failed_total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_is_clamped_positive() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 200);
    }
}

//! Expiry sweeper. Runs from a timer task and from the idempotent sweep
//! endpoint; read paths never trigger it. Each expired post is claimed
//! by a guarded status transition inside a transaction, so settlement
//! executes at most once no matter how many sweepers race.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::SqlitePool;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::auction::settlement;
use crate::db::store;
use crate::error::{AppError, Result};
use crate::types::{Notification, PaymentStatus, SettlementOutcome, SweepOutcome, SweepReport};

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Background task that settles expired auctions on a fixed interval.
pub struct Sweeper {
    pool: SqlitePool,
    notify_tx: mpsc::Sender<Notification>,
    health: Arc<HealthState>,
    interval_secs: u64,
}

impl Sweeper {
    pub fn new(
        pool: SqlitePool,
        notify_tx: mpsc::Sender<Notification>,
        health: Arc<HealthState>,
        interval_secs: u64,
    ) -> Self {
        Self { pool, notify_tx, health, interval_secs }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval_secs));
        ticker.tick().await; // consume immediate first tick

        loop {
            ticker.tick().await;
            match sweep_due(&self.pool, Some(&self.notify_tx), now_secs()).await {
                Ok(report) => self.health.record_sweep(&report, now_secs()),
                Err(e) => error!("Sweep tick failed: {e}"),
            }
        }
    }
}

/// Sweep every eligible post. Per-post infrastructure errors are counted
/// and logged but do not abort the pass; the post stays ACTIVE for the
/// next tick.
pub async fn sweep_due(
    pool: &SqlitePool,
    notify_tx: Option<&mpsc::Sender<Notification>>,
    now: i64,
) -> Result<SweepReport> {
    let due = store::fetch_due_post_ids(pool, now).await?;
    let mut report = SweepReport::default();

    for post_id in due {
        match sweep_post(pool, notify_tx, post_id, now).await {
            Ok(outcome) => report.record(outcome),
            Err(e) => {
                report.failed += 1;
                error!(post_id, "Sweep failed for post: {e}");
            }
        }
    }

    if report.processed > 0 || report.failed > 0 {
        info!(
            processed = report.processed,
            sold = report.sold,
            public_sale = report.public_sale,
            failed = report.failed,
            "Sweep complete",
        );
    }
    Ok(report)
}

/// Settle one expired post. The first statement claims the post by
/// conditionally transitioning it out of ACTIVE; zero rows affected
/// means another caller already has it (or it is not due) and the whole
/// call is a no-op. A successful settlement upgrades the claim to SOLD
/// before commit; a recoverable settlement failure leaves it ENDED so
/// the content falls through to public sale instead of sticking in
/// limbo. Any error rolls the transaction back with the post ACTIVE.
pub async fn sweep_post(
    pool: &SqlitePool,
    notify_tx: Option<&mpsc::Sender<Notification>>,
    post_id: i64,
    now: i64,
) -> Result<SweepOutcome> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE posts SET auction_status = 'ENDED', is_exclusive = 0
        WHERE id = ? AND auction_status = 'ACTIVE' AND auction_ends_at < ?
        "#,
    )
    .bind(post_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(SweepOutcome::Skipped);
    }

    let post = store::fetch_post_tx(&mut tx, post_id)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;

    let mut outcome = SweepOutcome::PublicSale;
    let mut notification = Notification::AuctionEnded {
        post_public_id: post.public_id.clone(),
        had_bids: post.bid_count > 0,
    };

    if post.bid_count > 0 {
        match store::fetch_winning_bid(&mut tx, post_id).await? {
            None => {
                // bid_count > 0 with no winning row is a broken invariant;
                // degrade rather than block the content.
                warn!(post = %post.public_id, "bid_count > 0 but no winning bid row");
            }
            Some(bid) => match settlement::settle(&mut tx, &post, &bid, now).await? {
                SettlementOutcome::Settled {
                    buyer_id,
                    buyer_name,
                    amount,
                    submitter_share,
                    platform_share,
                } => {
                    sqlx::query(
                        r#"
                        UPDATE posts SET auction_status = 'SOLD', is_exclusive = 1,
                               exclusive_buyer_id = ?, exclusive_buyer_name = ?, sold_at = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(buyer_id)
                    .bind(&buyer_name)
                    .bind(now)
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await?;

                    info!(
                        post = %post.public_id,
                        amount,
                        submitter_share,
                        platform_share,
                        buyer = %buyer_name,
                        "Auction settled as exclusive sale",
                    );
                    outcome = SweepOutcome::Sold;
                    notification = Notification::AuctionSold {
                        post_public_id: post.public_id.clone(),
                        buyer_name,
                        amount,
                    };
                }
                SettlementOutcome::Degraded(reason) => {
                    // Expected business outcome: the winner can't pay.
                    // Logged for operational review, never surfaced as a
                    // hard failure.
                    sqlx::query("UPDATE bids SET payment_status = ? WHERE id = ?")
                        .bind(PaymentStatus::Failed.as_str())
                        .bind(bid.id)
                        .execute(&mut *tx)
                        .await?;
                    warn!(
                        post = %post.public_id,
                        amount = bid.amount,
                        reason = %reason,
                        "Settlement degraded to public sale",
                    );
                }
            },
        }
    }

    tx.commit().await?;

    if let Some(tx_n) = notify_tx {
        if let Err(e) = tx_n.try_send(notification) {
            warn!("Notification channel full, dropping event: {e}");
        }
    }
    Ok(outcome)
}

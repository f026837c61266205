use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use crate::config::AUCTION_DURATION_SECS;
use crate::db::models::{AuctionPost, Bid, Earning, WonAuction};
use crate::error::Result;

/// Insert a new post and open its auction: ACTIVE, deadline one hour out.
/// Called by the listing collaborator; the auction core owns the
/// deadline initialization so the invariant lives in one place.
pub async fn create_post(
    pool: &SqlitePool,
    public_id: &str,
    owner_account_id: Option<i64>,
    media_ref: &str,
    now: i64,
) -> Result<AuctionPost> {
    let ends_at = now + AUCTION_DURATION_SECS;
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (public_id, owner_account_id, media_ref, auction_status,
                           auction_ends_at, bid_count, is_exclusive, created_at)
        VALUES (?, ?, ?, 'ACTIVE', ?, 0, 0, ?)
        RETURNING id
        "#,
    )
    .bind(public_id)
    .bind(owner_account_id)
    .bind(media_ref)
    .bind(ends_at)
    .bind(now)
    .fetch_one(pool)
    .await?;

    fetch_post(pool, id)
        .await?
        .ok_or_else(|| crate::error::AppError::Database(sqlx::Error::RowNotFound))
}

pub async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Option<AuctionPost>> {
    let post = sqlx::query_as::<_, AuctionPost>("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

pub async fn fetch_post_by_public_id(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<Option<AuctionPost>> {
    let post = sqlx::query_as::<_, AuctionPost>("SELECT * FROM posts WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

/// Same lookup inside an open transaction.
pub async fn fetch_post_tx(conn: &mut SqliteConnection, id: i64) -> Result<Option<AuctionPost>> {
    let post = sqlx::query_as::<_, AuctionPost>("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(post)
}

/// The current high bid for a post, if any.
pub async fn fetch_winning_bid(conn: &mut SqliteConnection, post_id: i64) -> Result<Option<Bid>> {
    let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE post_id = ? AND is_winning = 1")
        .bind(post_id)
        .fetch_optional(conn)
        .await?;
    Ok(bid)
}

/// Accepted bids for a post, newest first.
pub async fn fetch_bid_history(pool: &SqlitePool, post_id: i64, limit: i64) -> Result<Vec<Bid>> {
    let bids = sqlx::query_as::<_, Bid>(
        "SELECT * FROM bids WHERE post_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(post_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(bids)
}

/// Posts eligible for sweeping: still ACTIVE and past the deadline.
pub async fn fetch_due_post_ids(pool: &SqlitePool, now: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM posts WHERE auction_status = 'ACTIVE' AND auction_ends_at < ?",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Earnings ledger rows for a submitter account, newest first.
pub async fn fetch_earnings(pool: &SqlitePool, account_id: i64) -> Result<Vec<Earning>> {
    let rows = sqlx::query_as::<_, Earning>(
        "SELECT * FROM earnings WHERE account_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn fetch_grant_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<WonAuction>> {
    let grant =
        sqlx::query_as::<_, WonAuction>("SELECT * FROM won_auctions WHERE download_token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;
    Ok(grant)
}

pub async fn fetch_grant_for_post(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Option<WonAuction>> {
    let grant = sqlx::query_as::<_, WonAuction>("SELECT * FROM won_auctions WHERE post_id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    Ok(grant)
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod testing {
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    /// In-memory pool pinned to one connection: each SQLite `:memory:`
    /// connection is its own database, so the pool must never grow.
    pub async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    pub async fn create_account(pool: &SqlitePool, phone: &str, balance: i64) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO accounts (phone, display_name, credit_balance, created_at)
            VALUES (?, ?, ?, 0)
            RETURNING id
            "#,
        )
        .bind(phone)
        .bind(format!("acct-{phone}"))
        .bind(balance)
        .fetch_one(pool)
        .await
        .unwrap()
    }
}

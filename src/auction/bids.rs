//! Bid validation and placement. Acceptance is a compare-and-swap on
//! the post's `bid_count`: a bid that loses the race is rejected with a
//! retryable error, never silently reordered or merged.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::config::{
    ANTI_SNIPE_EXTENSION_SECS, ANTI_SNIPE_WINDOW_SECS, BID_INCREMENT_MINOR,
    MAX_AUCTION_DURATION_SECS, STARTING_BID_MINOR,
};
use crate::db::models::AuctionPost;
use crate::db::store;
use crate::error::{BidError, PlaceBidError};
use crate::types::{AuctionStatus, BidAccepted, PaymentStatus};

/// The lowest acceptable next bid for a post.
pub fn minimum_bid(post: &AuctionPost) -> i64 {
    if post.bid_count > 0 {
        post.current_bid.unwrap_or(0) + BID_INCREMENT_MINOR
    } else {
        STARTING_BID_MINOR
    }
}

/// Phone-shaped bidder identity: optional leading `+`, then 8-15 digits.
pub fn is_valid_bidder(identity: &str) -> bool {
    let digits = identity.strip_prefix('+').unwrap_or(identity);
    (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// New deadline after a bid at `now`. Within the anti-snipe window the
/// deadline moves to `now + extension`, clamped to the maximum total
/// duration; it never decreases.
pub fn extend_deadline(created_at: i64, ends_at: i64, now: i64) -> i64 {
    if ends_at - now >= ANTI_SNIPE_WINDOW_SECS {
        return ends_at;
    }
    let cap = created_at + MAX_AUCTION_DURATION_SECS;
    ends_at.max((now + ANTI_SNIPE_EXTENSION_SECS).min(cap))
}

/// Validate and place a bid. Preconditions are checked in order, each a
/// distinct rejection; on success the mutation is applied atomically
/// against the state the validation observed.
pub async fn place_bid(
    pool: &SqlitePool,
    post_public_id: &str,
    bidder_identity: &str,
    display_name: Option<&str>,
    amount: i64,
    now: i64,
) -> Result<BidAccepted, PlaceBidError> {
    let post = store::fetch_post_by_public_id(pool, post_public_id)
        .await
        .map_err(PlaceBidError::Internal)?
        .ok_or(BidError::PostNotFound)?;

    if post.status() != Some(AuctionStatus::Active) {
        return Err(BidError::NotActive.into());
    }
    // Rejected even if the sweeper has not run yet: a late bid is never
    // accepted-then-voided.
    if now >= post.auction_ends_at {
        return Err(BidError::Expired.into());
    }
    if !is_valid_bidder(bidder_identity) {
        return Err(BidError::InvalidBidder.into());
    }
    let minimum = minimum_bid(&post);
    if amount < minimum {
        return Err(BidError::TooLow { minimum }.into());
    }

    let new_ends_at = extend_deadline(post.created_at, post.auction_ends_at, now);
    let accepted = apply_bid(
        pool,
        &post,
        post.bid_count,
        bidder_identity,
        display_name,
        amount,
        new_ends_at,
        now,
    )
    .await?;

    debug!(
        post = %post.public_id,
        amount,
        bid_count = accepted.bid_count,
        ends_at = accepted.auction_ends_at,
        "bid accepted",
    );
    Ok(accepted)
}

/// Apply an already-validated bid, guarded by the `bid_count` the
/// validation read. Zero rows affected means another bid landed first.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn apply_bid(
    pool: &SqlitePool,
    post: &AuctionPost,
    expected_bid_count: i64,
    bidder_identity: &str,
    display_name: Option<&str>,
    amount: i64,
    new_ends_at: i64,
    now: i64,
) -> Result<BidAccepted, PlaceBidError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE posts SET current_bid = ?, bid_count = bid_count + 1, auction_ends_at = ?
        WHERE id = ? AND auction_status = 'ACTIVE' AND bid_count = ?
        "#,
    )
    .bind(amount)
    .bind(new_ends_at)
    .bind(post.id)
    .bind(expected_bid_count)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(BidError::StaleState.into());
    }

    sqlx::query("UPDATE bids SET is_winning = 0 WHERE post_id = ? AND is_winning = 1")
        .bind(post.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO bids (post_id, bidder_identity, bidder_display_name, amount,
                          is_winning, is_winner, payment_status, created_at)
        VALUES (?, ?, ?, ?, 1, 0, ?, ?)
        "#,
    )
    .bind(post.id)
    .bind(bidder_identity)
    .bind(display_name)
    .bind(amount)
    .bind(PaymentStatus::Pending.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(BidAccepted {
        current_bid: amount,
        bid_count: expected_bid_count + 1,
        auction_ends_at: new_ends_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AUCTION_DURATION_SECS;
    use crate::db::store::testing;

    const T0: i64 = 1_000_000;
    const PHONE_A: &str = "34600111222";
    const PHONE_B: &str = "34600333444";

    async fn seed_post(pool: &SqlitePool) -> AuctionPost {
        store::create_post(pool, "p-1", None, "media/1.jpg", T0).await.unwrap()
    }

    #[tokio::test]
    async fn floor_and_increment_sequence() {
        let pool = testing::pool().await;
        seed_post(&pool).await;

        let a = place_bid(&pool, "p-1", PHONE_A, Some("A"), 5000, T0 + 10).await.unwrap();
        assert_eq!(a.current_bid, 5000);
        assert_eq!(a.bid_count, 1);

        // 5400 < 5000 + 500 increment
        let err = place_bid(&pool, "p-1", PHONE_B, Some("B"), 5400, T0 + 20).await;
        match err {
            Err(PlaceBidError::Rejected(BidError::TooLow { minimum })) => {
                assert_eq!(minimum, 5500)
            }
            other => panic!("expected TooLow, got {other:?}"),
        }

        let b = place_bid(&pool, "p-1", PHONE_B, Some("B"), 5500, T0 + 30).await.unwrap();
        assert_eq!(b.current_bid, 5500);
        assert_eq!(b.bid_count, 2);
    }

    #[tokio::test]
    async fn rejected_bid_leaves_state_unchanged() {
        let pool = testing::pool().await;
        let post = seed_post(&pool).await;

        let _ = place_bid(&pool, "p-1", PHONE_A, None, 4999, T0 + 10).await.unwrap_err();

        let after = store::fetch_post(&pool, post.id).await.unwrap().unwrap();
        assert_eq!(after.current_bid, None);
        assert_eq!(after.bid_count, 0);
        assert_eq!(after.auction_ends_at, post.auction_ends_at);
        assert!(store::fetch_bid_history(&pool, post.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bid_after_deadline_rejected_even_before_sweep() {
        let pool = testing::pool().await;
        seed_post(&pool).await;

        let err = place_bid(&pool, "p-1", PHONE_A, None, 5000, T0 + AUCTION_DURATION_SECS)
            .await
            .unwrap_err();
        match err {
            PlaceBidError::Rejected(BidError::Expired) => {}
            other => panic!("expected Expired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_post_and_bad_identity() {
        let pool = testing::pool().await;
        seed_post(&pool).await;

        match place_bid(&pool, "nope", PHONE_A, None, 5000, T0 + 1).await {
            Err(PlaceBidError::Rejected(BidError::PostNotFound)) => {}
            other => panic!("expected PostNotFound, got {other:?}"),
        }
        match place_bid(&pool, "p-1", "not-a-phone", None, 5000, T0 + 1).await {
            Err(PlaceBidError::Rejected(BidError::InvalidBidder)) => {}
            other => panic!("expected InvalidBidder, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn anti_snipe_extends_from_bid_time() {
        let pool = testing::pool().await;
        let post = seed_post(&pool).await;

        // 30s before the deadline: inside the 60s window.
        let bid_time = post.auction_ends_at - 30;
        let accepted = place_bid(&pool, "p-1", PHONE_A, None, 5000, bid_time).await.unwrap();
        assert_eq!(accepted.auction_ends_at, bid_time + ANTI_SNIPE_EXTENSION_SECS);

        // Well before the deadline: no extension.
        let b = place_bid(&pool, "p-1", PHONE_B, None, 5500, bid_time + 1).await.unwrap();
        assert_eq!(b.auction_ends_at, bid_time + ANTI_SNIPE_EXTENSION_SECS);
    }

    #[test]
    fn extension_is_clamped_and_monotonic() {
        let created = 0;
        let cap = created + MAX_AUCTION_DURATION_SECS;

        // Near the cap the extension cannot push past it.
        let ends = cap - 10;
        let now = ends - 30;
        assert_eq!(extend_deadline(created, ends, now), cap);

        // At the cap the deadline stays put rather than shrinking.
        let now = cap - 5;
        assert_eq!(extend_deadline(created, cap, now), cap);
    }

    #[test]
    fn bidder_identity_rules() {
        assert!(is_valid_bidder("34600111222"));
        assert!(is_valid_bidder("+34600111222"));
        assert!(!is_valid_bidder("1234567"));
        assert!(!is_valid_bidder("34 600 111 222"));
        assert!(!is_valid_bidder("+"));
        assert!(!is_valid_bidder("1234567890123456"));
    }

    #[tokio::test]
    async fn stale_cas_is_rejected_and_harmless() {
        let pool = testing::pool().await;
        let post = seed_post(&pool).await;

        place_bid(&pool, "p-1", PHONE_A, None, 5000, T0 + 10).await.unwrap();

        // A second writer that validated against the pre-bid snapshot.
        let err = apply_bid(&pool, &post, 0, PHONE_B, None, 5000, post.auction_ends_at, T0 + 11)
            .await
            .unwrap_err();
        match err {
            PlaceBidError::Rejected(BidError::StaleState) => {}
            other => panic!("expected StaleState, got {other:?}"),
        }

        let after = store::fetch_post(&pool, post.id).await.unwrap().unwrap();
        assert_eq!(after.current_bid, Some(5000));
        assert_eq!(after.bid_count, 1);
        assert_eq!(store::fetch_bid_history(&pool, post.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn winning_flag_moves_to_latest_bid() {
        let pool = testing::pool().await;
        let post = seed_post(&pool).await;

        place_bid(&pool, "p-1", PHONE_A, Some("A"), 5000, T0 + 10).await.unwrap();
        place_bid(&pool, "p-1", PHONE_B, Some("B"), 6000, T0 + 20).await.unwrap();

        let bids = store::fetch_bid_history(&pool, post.id, 10).await.unwrap();
        assert_eq!(bids.len(), 2);
        let winning: Vec<_> = bids.iter().filter(|b| b.is_winning).collect();
        assert_eq!(winning.len(), 1);
        assert_eq!(winning[0].amount, 6000);
        assert_eq!(winning[0].bidder_identity, PHONE_B);
    }
}

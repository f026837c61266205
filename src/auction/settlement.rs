//! Settlement of a winning bid: debit the buyer, split the revenue,
//! issue the exclusive download grant, and credit the submitter. Runs
//! inside the sweep's claim transaction so it either commits whole or
//! leaves no trace. Insufficient funds and missing buyer accounts are
//! expected business outcomes, reported as degradation rather than
//! errors.

use rand::RngCore;
use sqlx::SqliteConnection;

use crate::config::{GRANT_MAX_DOWNLOADS, GRANT_TTL_SECS};
use crate::db::models::{AuctionPost, Bid};
use crate::error::Result;
use crate::ledger::{self, DebitOutcome};
use crate::registry;
use crate::types::{DegradeReason, PaymentStatus, SettlementOutcome};

/// Submitter / platform split. Floor division: the odd minor unit goes
/// to the platform, never the submitter. Always sums to `amount`.
pub fn revenue_split(amount: i64) -> (i64, i64) {
    let submitter = amount / 2;
    (submitter, amount - submitter)
}

/// Opaque unguessable download token: 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Public-facing bidder name: display name if given, else the identity
/// with everything but the last four digits masked.
pub fn buyer_name(bid: &Bid) -> String {
    match bid.bidder_display_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => mask_identity(&bid.bidder_identity),
    }
}

pub fn mask_identity(identity: &str) -> String {
    let tail: String = identity
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{tail}")
}

/// Charge the winning bid and issue the grant. `conn` must be inside an
/// open transaction owned by the sweep.
pub async fn settle(
    conn: &mut SqliteConnection,
    post: &AuctionPost,
    bid: &Bid,
    now: i64,
) -> Result<SettlementOutcome> {
    let buyer = match ledger::account_by_phone(conn, &bid.bidder_identity).await? {
        Some(acct) => acct,
        None => return Ok(SettlementOutcome::Degraded(DegradeReason::NoBuyerAccount)),
    };

    // Authoritative balance check: the balance may have changed since
    // the bid was placed.
    match ledger::debit(conn, buyer.id, bid.amount).await? {
        DebitOutcome::Ok => {}
        DebitOutcome::InsufficientFunds => {
            return Ok(SettlementOutcome::Degraded(DegradeReason::InsufficientFunds))
        }
        DebitOutcome::NoAccount => {
            return Ok(SettlementOutcome::Degraded(DegradeReason::NoBuyerAccount))
        }
    }
    ledger::record_win(conn, buyer.id, bid.amount).await?;

    let (submitter_share, platform_share) = revenue_split(bid.amount);

    let token = generate_token();
    sqlx::query(
        r#"
        INSERT INTO won_auctions (buyer_id, post_id, winning_bid, download_token,
                                  max_downloads, download_count, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(buyer.id)
    .bind(post.id)
    .bind(bid.amount)
    .bind(&token)
    .bind(GRANT_MAX_DOWNLOADS)
    .bind(now + GRANT_TTL_SECS)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE bids SET is_winner = 1, payment_status = ? WHERE id = ?")
        .bind(PaymentStatus::Paid.as_str())
        .bind(bid.id)
        .execute(&mut *conn)
        .await?;

    // Attribute the submitter share when the post has a linked account;
    // anonymous submitters forfeit it.
    let owner = registry::content_meta(conn, post.id)
        .await?
        .and_then(|meta| meta.owner_account_id);
    if let Some(owner_id) = owner {
        sqlx::query(
            "INSERT INTO earnings (account_id, post_id, amount, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(post.id)
        .bind(submitter_share)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        ledger::record_earning(conn, owner_id, submitter_share).await?;
    }

    Ok(SettlementOutcome::Settled {
        buyer_id: buyer.id,
        buyer_name: buyer_name(bid),
        amount: bid.amount,
        submitter_share,
        platform_share,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_always_sums_and_favors_platform() {
        for amount in [5000, 5555, 1, 0, 999_999] {
            let (submitter, platform) = revenue_split(amount);
            assert_eq!(submitter + platform, amount);
            assert!(platform >= submitter);
        }
        assert_eq!(revenue_split(5555), (2777, 2778));
    }

    #[test]
    fn token_is_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn identity_masking_keeps_tail_only() {
        assert_eq!(mask_identity("34600111222"), "***1222");
        assert_eq!(mask_identity("+34600111222"), "***1222");
    }
}

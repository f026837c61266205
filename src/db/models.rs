use serde::Serialize;
use sqlx::FromRow;

use crate::types::AuctionStatus;

/// A content post with its auction fields. `auction_status` is stored as
/// TEXT; use [`AuctionPost::status`] for the typed view.
#[derive(Debug, Clone, FromRow)]
pub struct AuctionPost {
    pub id: i64,
    pub public_id: String,
    pub owner_account_id: Option<i64>,
    pub media_ref: String,
    pub auction_status: String,
    pub auction_ends_at: i64,
    pub current_bid: Option<i64>,
    pub bid_count: i64,
    pub is_exclusive: bool,
    pub exclusive_buyer_id: Option<i64>,
    pub exclusive_buyer_name: Option<String>,
    pub sold_at: Option<i64>,
    pub created_at: i64,
}

impl AuctionPost {
    pub fn status(&self) -> Option<AuctionStatus> {
        AuctionStatus::parse(&self.auction_status)
    }

    /// True once the auction ended without an exclusive sale; the
    /// content is then available for ordinary public purchase.
    pub fn can_buy_public(&self) -> bool {
        self.status() == Some(AuctionStatus::Ended)
    }
}

/// One accepted bid. Append-only; at most one row per post has
/// `is_winning = true` at any time.
#[derive(Debug, Clone, FromRow)]
pub struct Bid {
    pub id: i64,
    pub post_id: i64,
    pub bidder_identity: String,
    pub bidder_display_name: Option<String>,
    pub amount: i64,
    pub is_winning: bool,
    pub is_winner: bool,
    pub payment_status: String,
    pub created_at: i64,
}

/// Ledger principal. Balance columns are written only by the ledger
/// module's guarded updates.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    pub credit_balance: i64,
    pub total_spent: i64,
    pub total_earned: i64,
    pub auctions_won: i64,
    pub created_at: i64,
}

/// Exclusive download grant, created exactly once per SOLD post.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WonAuction {
    pub id: i64,
    pub buyer_id: i64,
    pub post_id: i64,
    pub winning_bid: i64,
    pub download_token: String,
    pub max_downloads: i64,
    pub download_count: i64,
    pub expires_at: i64,
    pub created_at: i64,
}

impl WonAuction {
    pub fn remaining_downloads(&self) -> i64 {
        self.max_downloads - self.download_count
    }

    /// A grant resolves only while it has downloads left and has not
    /// expired.
    pub fn is_resolvable(&self, now: i64) -> bool {
        self.remaining_downloads() > 0 && self.expires_at > now
    }
}

/// Append-only submitter earnings ledger row.
#[derive(Debug, Clone, FromRow)]
pub struct Earning {
    pub id: i64,
    pub account_id: i64,
    pub post_id: i64,
    pub amount: i64,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(download_count: i64, expires_at: i64) -> WonAuction {
        WonAuction {
            id: 1,
            buyer_id: 1,
            post_id: 1,
            winning_bid: 5000,
            download_token: "tok".to_string(),
            max_downloads: 99,
            download_count,
            expires_at,
            created_at: 0,
        }
    }

    #[test]
    fn grant_resolvable_until_expired_or_exhausted() {
        let g = grant(0, 1000);
        assert_eq!(g.remaining_downloads(), 99);
        assert!(g.is_resolvable(999));
        // Expiry boundary is exclusive.
        assert!(!g.is_resolvable(1000));

        let spent = grant(99, 1000);
        assert_eq!(spent.remaining_downloads(), 0);
        assert!(!spent.is_resolvable(0));
    }

    #[test]
    fn public_sale_follows_ended_only() {
        let mut post = AuctionPost {
            id: 1,
            public_id: "p-1".to_string(),
            owner_account_id: None,
            media_ref: String::new(),
            auction_status: "ACTIVE".to_string(),
            auction_ends_at: 3600,
            current_bid: None,
            bid_count: 0,
            is_exclusive: false,
            exclusive_buyer_id: None,
            exclusive_buyer_name: None,
            sold_at: None,
            created_at: 0,
        };
        assert!(!post.can_buy_public());

        post.auction_status = "ENDED".to_string();
        assert!(post.can_buy_public());

        post.auction_status = "SOLD".to_string();
        assert!(!post.can_buy_public());
    }
}

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auction lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of a post's exclusive auction. Terminal once non-ACTIVE;
/// only the sweeper writes the terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    /// Bidding window open.
    Active,
    /// Auction ended with no exclusive sale, public-sale fallback.
    Ended,
    /// Exclusive sale settled.
    Sold,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Ended => "ENDED",
            AuctionStatus::Sold => "SOLD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AuctionStatus::Active),
            "ENDED" => Some(AuctionStatus::Ended),
            "SOLD" => Some(AuctionStatus::Sold),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bid placement results
// ---------------------------------------------------------------------------

/// Returned to the client after an accepted bid, for display.
#[derive(Debug, Clone, Serialize)]
pub struct BidAccepted {
    pub current_bid: i64,
    pub bid_count: i64,
    pub auction_ends_at: i64,
}

// ---------------------------------------------------------------------------
// Sweep results
// ---------------------------------------------------------------------------

/// Per-post outcome of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Another caller claimed the post first, or it was not due.
    Skipped,
    /// No bids, or the winner could not pay; public-sale fallback.
    PublicSale,
    /// Settled as an exclusive sale.
    Sold,
}

/// Aggregate counts returned by a sweep invocation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
    pub processed: u64,
    pub sold: u64,
    pub public_sale: u64,
    pub failed: u64,
}

impl SweepReport {
    pub fn record(&mut self, outcome: SweepOutcome) {
        match outcome {
            SweepOutcome::Skipped => {}
            SweepOutcome::PublicSale => {
                self.processed += 1;
                self.public_sale += 1;
            }
            SweepOutcome::Sold => {
                self.processed += 1;
                self.sold += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Why a settlement attempt degraded to the public-sale fallback.
/// These are expected business outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    InsufficientFunds,
    NoBuyerAccount,
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DegradeReason::InsufficientFunds => "insufficient_funds",
            DegradeReason::NoBuyerAccount => "no_buyer_account",
        };
        write!(f, "{s}")
    }
}

/// Result of running settlement for a winning bid.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Settled {
        buyer_id: i64,
        buyer_name: String,
        amount: i64,
        submitter_share: i64,
        platform_share: i64,
    },
    Degraded(DegradeReason),
}

// ---------------------------------------------------------------------------
// Channel message types
// ---------------------------------------------------------------------------

/// Settlement outcomes routed to the notification dispatcher.
/// Fire-and-forget; never part of the transactional core.
#[derive(Debug, Clone)]
pub enum Notification {
    AuctionSold {
        post_public_id: String,
        buyer_name: String,
        amount: i64,
    },
    AuctionEnded {
        post_public_id: String,
        had_bids: bool,
    },
}

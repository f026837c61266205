//! Fire-and-forget notification dispatcher. Settlement outcomes arrive
//! over an mpsc channel after the transaction commits; delivery to the
//! external push system is out of scope, so the dispatcher logs the
//! event. Losing one never affects auction correctness.

use tokio::sync::mpsc;
use tracing::info;

use crate::types::Notification;

pub struct NotificationDispatcher {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationDispatcher {
    pub fn new(rx: mpsc::Receiver<Notification>) -> Self {
        Self { rx }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match event {
                Notification::AuctionSold { post_public_id, buyer_name, amount } => {
                    info!(
                        event = "AUCTION_SOLD",
                        post = %post_public_id,
                        buyer = %buyer_name,
                        amount,
                        "Exclusive sale notification",
                    );
                }
                Notification::AuctionEnded { post_public_id, had_bids } => {
                    info!(
                        event = "AUCTION_ENDED",
                        post = %post_public_id,
                        had_bids,
                        "Public-sale fallback notification",
                    );
                }
            }
        }
    }
}

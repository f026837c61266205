use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Synchronous bid rejections. Each maps to a stable machine-readable
/// code returned to the client; none of these change auction state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidError {
    #[error("post not found")]
    PostNotFound,

    #[error("auction is not active")]
    NotActive,

    #[error("auction deadline has passed")]
    Expired,

    #[error("bidder identity is not a valid phone number")]
    InvalidBidder,

    #[error("bid below minimum of {minimum}")]
    TooLow { minimum: i64 },

    /// Lost the compare-and-swap race against a concurrent bid. The
    /// caller may retry against the refreshed state.
    #[error("auction state changed, retry")]
    StaleState,
}

impl BidError {
    pub fn code(&self) -> &'static str {
        match self {
            BidError::PostNotFound => "POST_NOT_FOUND",
            BidError::NotActive => "AUCTION_NOT_ACTIVE",
            BidError::Expired => "AUCTION_EXPIRED",
            BidError::InvalidBidder => "INVALID_BIDDER",
            BidError::TooLow { .. } => "BID_TOO_LOW",
            BidError::StaleState => "STALE_STATE",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, BidError::StaleState)
    }
}

impl IntoResponse for BidError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BidError::PostNotFound => StatusCode::NOT_FOUND,
            BidError::NotActive | BidError::Expired => StatusCode::GONE,
            BidError::InvalidBidder | BidError::TooLow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BidError::StaleState => StatusCode::CONFLICT,
        };
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
            "retryable": self.retryable(),
        });
        (status, Json(body)).into_response()
    }
}

/// Either an infrastructure failure or a bid rejection. Used by the bid
/// placement path so handlers can map the two taxonomies separately.
#[derive(Debug, Error)]
pub enum PlaceBidError {
    #[error(transparent)]
    Rejected(#[from] BidError),

    #[error(transparent)]
    Internal(#[from] AppError),
}

impl From<sqlx::Error> for PlaceBidError {
    fn from(e: sqlx::Error) -> Self {
        PlaceBidError::Internal(AppError::Database(e))
    }
}

impl IntoResponse for PlaceBidError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PlaceBidError::Rejected(e) => e.into_response(),
            PlaceBidError::Internal(e) => e.into_response(),
        }
    }
}

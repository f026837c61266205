pub mod bids;
pub mod settlement;
pub mod sweep;

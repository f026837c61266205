//! Shared ops state for the /health endpoint.
//! Updated by the Sweeper task and the sweep endpoint.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::types::SweepReport;

/// Shared sweep metrics. Updated by sweep callers, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// Epoch seconds of the last completed sweep pass (0 = none yet).
    pub last_sweep_at: AtomicI64,
    /// Total sweep passes completed.
    pub sweeps_run: AtomicU64,
    /// Auctions settled as exclusive sales since startup.
    pub sold_total: AtomicU64,
    /// Auctions released to public sale since startup.
    pub public_sale_total: AtomicU64,
    /// Per-post sweep failures since startup.
    pub failed_total: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sweep(&self, report: &SweepReport, now: i64) {
        self.last_sweep_at.store(now, Ordering::Relaxed);
        self.sweeps_run.fetch_add(1, Ordering::Relaxed);
        self.sold_total.fetch_add(report.sold, Ordering::Relaxed);
        self.public_sale_total.fetch_add(report.public_sale, Ordering::Relaxed);
        self.failed_total.fetch_add(report.failed, Ordering::Relaxed);
    }

    pub fn last_sweep_at(&self) -> i64 {
        self.last_sweep_at.load(Ordering::Relaxed)
    }

    pub fn sweeps_run(&self) -> u64 {
        self.sweeps_run.load(Ordering::Relaxed)
    }

    pub fn sold_total(&self) -> u64 {
        self.sold_total.load(Ordering::Relaxed)
    }

    pub fn public_sale_total(&self) -> u64 {
        self.public_sale_total.load(Ordering::Relaxed)
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }
}

//! Request counters for the /health endpoint. Updated by the analyze handler.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    pub requests_total: AtomicU64,
    pub requests_failed: AtomicU64,
    /// Nanosecond timestamp of the last successful analysis (0 = none).
    pub last_success_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_ns: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.last_success_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn last_success_at_ns(&self) -> u64 {
        self.last_success_at_ns.load(Ordering::Relaxed)
    }
}

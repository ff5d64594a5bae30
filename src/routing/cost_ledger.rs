//! # Cost Ledger
//!
//! Process-wide spend and request accounting. The ledger is an owned service
//! object shared through `Arc`, so every test or autopilot instance gets an
//! isolated ledger.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the ledger counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub cumulative_cost: f64,
    pub request_count: u64,
}

/// Cumulative cost and request counter
///
/// Both counters are updated under a single lock so a reader never observes
/// a cost without its matching request.
#[derive(Debug, Default)]
pub struct CostLedger {
    state: Mutex<LedgerSnapshot>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one request of the given cost. Only `TaskRouter::track_usage`
    /// calls this.
    pub(crate) fn record(&self, cost: f64) {
        let cost = if cost.is_finite() { cost.max(0.0) } else { 0.0 };
        let mut state = self.state.lock();
        state.cumulative_cost += cost;
        state.request_count += 1;
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        *self.state.lock()
    }

    pub fn request_count(&self) -> u64 {
        self.state.lock().request_count
    }

    pub fn cumulative_cost(&self) -> f64 {
        self.state.lock().cumulative_cost
    }
}

/// Usage report derived from a ledger snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub total_cost: f64,
    pub avg_cost_per_request: f64,
    /// Percentage saved relative to paying the baseline cost for every request
    pub savings_vs_baseline_percent: f64,
}

impl UsageStats {
    pub fn from_snapshot(snapshot: LedgerSnapshot, baseline_cost_per_request: f64) -> Self {
        let requests = snapshot.request_count;
        let total_cost = snapshot.cumulative_cost;

        let avg_cost_per_request = if requests == 0 {
            0.0
        } else {
            total_cost / requests as f64
        };

        let baseline_total = requests as f64 * baseline_cost_per_request;
        let savings_vs_baseline_percent = if requests == 0 || baseline_total <= 0.0 {
            0.0
        } else {
            (1.0 - total_cost / baseline_total) * 100.0
        };

        Self {
            total_requests: requests,
            total_cost: round_to(total_cost, 6),
            avg_cost_per_request: round_to(avg_cost_per_request, 6),
            savings_vs_baseline_percent: round_to(savings_vs_baseline_percent, 1),
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

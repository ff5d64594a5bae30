//! # Backend Routing
//!
//! Cost-aware selection of compute backends.
//!
//! - **TaskRouter**: total `(category, tier) -> backend` lookup, cost estimation,
//!   usage tracking and reporting
//! - **CostLedger**: lock-guarded cumulative cost and request counters

pub mod cost_ledger;
pub mod task_router;

pub use cost_ledger::{CostLedger, LedgerSnapshot, UsageStats};
pub use task_router::{
    default_route_entries, default_unit_costs, BackendId, ComplexityTier, CostTable,
    RouteDecision, RouteEntry, RouteExplanation, RoutingTable, TaskCategory, TaskRouter,
};

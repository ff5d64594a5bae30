//! # Task Router
//!
//! Deterministic backend selection keyed by task category and complexity tier,
//! plus cost estimation and usage tracking against a [`CostLedger`].
//!
//! ## Totality
//!
//! Every `(TaskCategory, ComplexityTier)` pair resolves to a backend. Pairs
//! absent from the routing table resolve to the table's default backend and
//! the returned [`RouteDecision`] marks the lookup as a fallback. Backends
//! absent from the cost table are priced at the default unit cost.
//!
//! Selection and estimation only read immutable tables and need no locking.
//! `track_usage` is the single path that mutates the ledger.

use super::cost_ledger::{round_to, CostLedger, UsageStats};
use crate::constants::defaults;
use crate::error::AutopilotError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Kind of work a backend is asked to reason about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Infrastructure-as-code (Terraform)
    Terraform,
    Security,
    /// Container builds and images
    Docker,
    /// Kubernetes manifests
    K8s,
    /// State comparison and drift
    Diff,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Terraform,
        TaskCategory::Security,
        TaskCategory::Docker,
        TaskCategory::K8s,
        TaskCategory::Diff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Terraform => "terraform",
            TaskCategory::Security => "security",
            TaskCategory::Docker => "docker",
            TaskCategory::K8s => "k8s",
            TaskCategory::Diff => "diff",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = AutopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AutopilotError::Validation(format!("Unknown task category: {s}")))
    }
}

/// Declared complexity of a task, ordered `Simple < Moderate < Complex`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl ComplexityTier {
    pub const ALL: [ComplexityTier; 3] = [
        ComplexityTier::Simple,
        ComplexityTier::Moderate,
        ComplexityTier::Complex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Moderate => "moderate",
            ComplexityTier::Complex => "complex",
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = AutopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplexityTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AutopilotError::Validation(format!("Unknown complexity tier: {s}")))
    }
}

/// Opaque name of a compute backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One `(category, tier) -> backend` entry, the serialized form of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub category: TaskCategory,
    pub tier: ComplexityTier,
    pub backend: BackendId,
}

/// Result of a routing lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub backend: BackendId,
    /// True when the pair had no entry and the default backend was used
    pub fallback: bool,
}

/// Finite `(TaskCategory, ComplexityTier) -> BackendId` map with a default
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    routes: HashMap<(TaskCategory, ComplexityTier), BackendId>,
    default_backend: BackendId,
}

impl RoutingTable {
    /// Empty table: every lookup falls back to `default_backend`
    pub fn new(default_backend: impl Into<BackendId>) -> Self {
        Self {
            routes: HashMap::new(),
            default_backend: default_backend.into(),
        }
    }

    pub fn from_entries(
        default_backend: impl Into<BackendId>,
        entries: impl IntoIterator<Item = RouteEntry>,
    ) -> Self {
        let mut table = Self::new(default_backend);
        for entry in entries {
            table.insert(entry.category, entry.tier, entry.backend);
        }
        table
    }

    pub fn with_route(
        mut self,
        category: TaskCategory,
        tier: ComplexityTier,
        backend: impl Into<BackendId>,
    ) -> Self {
        self.insert(category, tier, backend.into());
        self
    }

    pub fn insert(&mut self, category: TaskCategory, tier: ComplexityTier, backend: BackendId) {
        self.routes.insert((category, tier), backend);
    }

    pub fn lookup(&self, category: TaskCategory, tier: ComplexityTier) -> RouteDecision {
        match self.routes.get(&(category, tier)) {
            Some(backend) => RouteDecision {
                backend: backend.clone(),
                fallback: false,
            },
            None => RouteDecision {
                backend: self.default_backend.clone(),
                fallback: true,
            },
        }
    }

    pub fn default_backend(&self) -> &BackendId {
        &self.default_backend
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Entries sorted by category then tier
    pub fn entries(&self) -> Vec<RouteEntry> {
        let mut entries: Vec<RouteEntry> = self
            .routes
            .iter()
            .map(|((category, tier), backend)| RouteEntry {
                category: *category,
                tier: *tier,
                backend: backend.clone(),
            })
            .collect();
        entries.sort_by_key(|entry| (entry.category, entry.tier));
        entries
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::from_entries(defaults::DEFAULT_BACKEND, default_route_entries())
    }
}

/// The production routing table
pub fn default_route_entries() -> Vec<RouteEntry> {
    use ComplexityTier::{Complex, Moderate, Simple};
    use TaskCategory::{Diff, Docker, Security, Terraform, K8s};

    [
        (Terraform, Complex, "claude-3-5-sonnet"),
        (Terraform, Moderate, "gpt-4o"),
        (Terraform, Simple, "gpt-4o-mini"),
        (Security, Complex, "gpt-4o"),
        (Security, Moderate, "gpt-4o-mini"),
        (Security, Simple, "claude-3-5-haiku"),
        (Docker, Complex, "claude-3-5-sonnet"),
        (Docker, Moderate, "gpt-4o"),
        (Docker, Simple, "gpt-4o-mini"),
        (K8s, Complex, "claude-3-5-sonnet"),
        (K8s, Moderate, "gpt-4o"),
        (K8s, Simple, "gpt-4o-mini"),
        (Diff, Complex, "gpt-4o"),
        (Diff, Moderate, "gpt-4o-mini"),
        (Diff, Simple, "claude-3-5-haiku"),
    ]
    .into_iter()
    .map(|(category, tier, backend)| RouteEntry {
        category,
        tier,
        backend: BackendId::new(backend),
    })
    .collect()
}

/// Unit cost per 1000 tokens for each backend
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    unit_costs: HashMap<BackendId, f64>,
    default_unit_cost: f64,
}

impl CostTable {
    pub fn new(default_unit_cost: f64) -> Self {
        Self {
            unit_costs: HashMap::new(),
            default_unit_cost: sanitize_cost(default_unit_cost),
        }
    }

    pub fn with_unit_cost(mut self, backend: impl Into<BackendId>, unit_cost: f64) -> Self {
        self.insert(backend.into(), unit_cost);
        self
    }

    pub fn insert(&mut self, backend: BackendId, unit_cost: f64) {
        self.unit_costs.insert(backend, sanitize_cost(unit_cost));
    }

    pub fn unit_cost(&self, backend: &BackendId) -> f64 {
        self.unit_costs
            .get(backend)
            .copied()
            .unwrap_or(self.default_unit_cost)
    }

    pub fn contains(&self, backend: &BackendId) -> bool {
        self.unit_costs.contains_key(backend)
    }

    pub fn default_unit_cost(&self) -> f64 {
        self.default_unit_cost
    }
}

impl Default for CostTable {
    fn default() -> Self {
        let mut table = Self::new(defaults::DEFAULT_UNIT_COST);
        for (backend, cost) in default_unit_costs() {
            table.insert(backend, cost);
        }
        table
    }
}

/// Published per-1K-token prices of the production backends
pub fn default_unit_costs() -> HashMap<BackendId, f64> {
    HashMap::from([
        (BackendId::new("gpt-4o-mini"), 0.00015),
        (BackendId::new("gpt-4o"), 0.0025),
        (BackendId::new("claude-3-5-sonnet"), 0.003),
        (BackendId::new("claude-3-5-haiku"), 0.0008),
    ])
}

fn sanitize_cost(cost: f64) -> f64 {
    if cost.is_finite() {
        cost.max(0.0)
    } else {
        0.0
    }
}

/// Human-readable account of a routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteExplanation {
    pub backend: BackendId,
    pub reason: String,
    /// Cost of a 1000-token request on the selected backend
    pub estimated_cost: f64,
    pub category: TaskCategory,
    pub tier: ComplexityTier,
    pub fallback: bool,
}

impl fmt::Display for RouteExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend selected: {}", self.backend)?;
        writeln!(f, "Reason: {}", self.reason)?;
        writeln!(f, "Estimated cost: ${:.6}", self.estimated_cost)?;
        write!(f, "Task: {} ({})", self.category, self.tier)?;
        if self.fallback {
            write!(f, " [default route]")?;
        }
        Ok(())
    }
}

fn backend_reason(backend: &BackendId) -> &'static str {
    match backend.as_str() {
        "claude-3-5-sonnet" => "Advanced reasoning for complex infrastructure analysis",
        "gpt-4o" => "Balanced performance for general DevOps tasks",
        "gpt-4o-mini" => "Fast and cost-effective for simple validations",
        "claude-3-5-haiku" => "Ultra-fast for quick checks",
        _ => "Optimal for this task",
    }
}

/// Backend selector and usage tracker
#[derive(Debug)]
pub struct TaskRouter {
    table: RoutingTable,
    costs: CostTable,
    ledger: Arc<CostLedger>,
    baseline_cost_per_request: f64,
}

impl TaskRouter {
    pub fn new(table: RoutingTable, costs: CostTable, ledger: Arc<CostLedger>) -> Self {
        Self {
            table,
            costs,
            ledger,
            baseline_cost_per_request: defaults::BASELINE_COST_PER_REQUEST,
        }
    }

    /// Router over the production tables with a fresh ledger
    pub fn with_defaults() -> Self {
        Self::new(
            RoutingTable::default(),
            CostTable::default(),
            Arc::new(CostLedger::new()),
        )
    }

    pub fn with_baseline_cost(mut self, baseline_cost_per_request: f64) -> Self {
        self.baseline_cost_per_request = sanitize_cost(baseline_cost_per_request);
        self
    }

    pub fn select_backend(&self, category: TaskCategory, tier: ComplexityTier) -> BackendId {
        self.route(category, tier).backend
    }

    /// Lookup that also reports whether the default route was taken
    pub fn route(&self, category: TaskCategory, tier: ComplexityTier) -> RouteDecision {
        let decision = self.table.lookup(category, tier);
        if decision.fallback {
            debug!(
                category = %category,
                tier = %tier,
                backend = %decision.backend,
                "No route declared, using default backend"
            );
        }
        decision
    }

    pub fn estimate_cost(&self, backend: &BackendId, token_count: u64) -> f64 {
        (token_count as f64 / 1000.0) * self.costs.unit_cost(backend)
    }

    /// Charge one request of `token_count` tokens on `backend` to the ledger.
    /// Returns the cost that was recorded.
    pub fn track_usage(&self, backend: &BackendId, token_count: u64) -> f64 {
        let cost = self.estimate_cost(backend, token_count);
        self.ledger.record(cost);
        debug!(
            backend = %backend,
            tokens = token_count,
            cost = cost,
            "Tracked backend usage"
        );
        cost
    }

    pub fn usage_stats(&self) -> UsageStats {
        UsageStats::from_snapshot(self.ledger.snapshot(), self.baseline_cost_per_request)
    }

    pub fn explain_route(&self, category: TaskCategory, tier: ComplexityTier) -> RouteExplanation {
        let decision = self.route(category, tier);
        let estimated_cost = round_to(
            self.estimate_cost(&decision.backend, defaults::QUOTE_TOKENS),
            6,
        );

        RouteExplanation {
            reason: backend_reason(&decision.backend).to_string(),
            backend: decision.backend,
            estimated_cost,
            category,
            tier,
            fallback: decision.fallback,
        }
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn cost_table(&self) -> &CostTable {
        &self.costs
    }
}

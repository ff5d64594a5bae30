//! # Autopilot Configuration
//!
//! Layered configuration for routing, accounting, history and tooling.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults ([`AutopilotConfig::default`])
//! 2. A configuration file: `config/autopilot.{toml,yaml,json}` when present,
//!    or an explicit path passed to [`AutopilotConfig::load_from`]
//! 3. `AUTOPILOT__*` environment variables, `__` separating nested keys
//!    (e.g. `AUTOPILOT__HISTORY_CAPACITY=50`,
//!    `AUTOPILOT__TOOLS__IMAGE_SCAN__TIMEOUT_MS=300000`)
//!
//! Tables merge key by key across layers; arrays such as `routes` are
//! replaced wholesale.

use crate::constants::defaults;
use crate::error::{AutopilotError, Result};
use crate::routing::{
    default_route_entries, default_unit_costs, BackendId, CostLedger, CostTable, RouteEntry,
    RoutingTable, TaskRouter,
};
use crate::tools::{default_tool_settings, ToolSettings};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_CONFIG_FILE: &str = "config/autopilot";
const ENV_PREFIX: &str = "AUTOPILOT";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Number of workflow records retained for reporting
    pub history_capacity: usize,
    /// Backend for `(category, tier)` pairs without a route
    pub default_backend: String,
    /// Per-1K-token cost for backends missing from `unit_costs`
    pub default_unit_cost: f64,
    /// Comparison baseline for the savings figure in usage stats
    pub baseline_cost_per_request: f64,
    /// Tokens charged per tool run when a tool sets no estimate
    pub tokens_per_request: u64,
    pub unit_costs: BTreeMap<String, f64>,
    pub routes: Vec<RouteEntry>,
    /// Tool settings keyed by workflow step name
    pub tools: BTreeMap<String, ToolSettings>,
    pub cache_enabled: bool,
    /// Maximum number of cached tool payloads
    pub cache_capacity: usize,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            history_capacity: defaults::HISTORY_CAPACITY,
            default_backend: defaults::DEFAULT_BACKEND.to_string(),
            default_unit_cost: defaults::DEFAULT_UNIT_COST,
            baseline_cost_per_request: defaults::BASELINE_COST_PER_REQUEST,
            tokens_per_request: defaults::TOKENS_PER_REQUEST,
            unit_costs: default_unit_costs()
                .into_iter()
                .map(|(backend, cost)| (backend.as_str().to_string(), cost))
                .collect(),
            routes: default_route_entries(),
            tools: default_tool_settings(),
            cache_enabled: true,
            cache_capacity: defaults::CACHE_CAPACITY,
        }
    }
}

impl AutopilotConfig {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit configuration file. A given path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let loaded: AutopilotConfig = Config::builder()
            .add_source(Config::try_from(&AutopilotConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        debug!(
            history_capacity = loaded.history_capacity,
            routes = loaded.routes.len(),
            tools = loaded.tools.len(),
            cache_enabled = loaded.cache_enabled,
            cache_capacity = loaded.cache_capacity,
            "Autopilot configuration loaded"
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity < defaults::MIN_HISTORY_CAPACITY {
            return Err(AutopilotError::configuration(
                "history",
                format!(
                    "history_capacity must be at least {}, got {}",
                    defaults::MIN_HISTORY_CAPACITY,
                    self.history_capacity
                ),
            ));
        }

        if self.default_backend.trim().is_empty() {
            return Err(AutopilotError::configuration("routing", "default_backend is empty"));
        }

        ensure_cost("default_unit_cost", self.default_unit_cost)?;
        for (backend, cost) in &self.unit_costs {
            ensure_cost(&format!("unit_costs.{backend}"), *cost)?;
        }
        ensure_cost("baseline_cost_per_request", self.baseline_cost_per_request)?;
        if self.baseline_cost_per_request == 0.0 {
            return Err(AutopilotError::configuration(
                "routing",
                "baseline_cost_per_request must be greater than zero",
            ));
        }

        if self.tokens_per_request == 0 {
            return Err(AutopilotError::configuration(
                "routing",
                "tokens_per_request must be greater than zero",
            ));
        }

        if self.cache_capacity == 0 {
            return Err(AutopilotError::configuration(
                "cache",
                "cache_capacity must be greater than zero",
            ));
        }

        for (step, tool) in &self.tools {
            if tool.timeout_ms == 0 {
                return Err(AutopilotError::configuration(
                    "tools",
                    format!("{step}: timeout_ms must be greater than zero"),
                ));
            }
            if tool.image.trim().is_empty() || tool.command.trim().is_empty() {
                return Err(AutopilotError::configuration(
                    "tools",
                    format!("{step}: image and command are required"),
                ));
            }
            if tool.accepted_exit_codes.is_empty() {
                return Err(AutopilotError::configuration(
                    "tools",
                    format!("{step}: accepted_exit_codes is empty"),
                ));
            }
        }

        for route in &self.routes {
            if !self.unit_costs.contains_key(route.backend.as_str()) {
                warn!(
                    backend = %route.backend,
                    category = %route.category,
                    tier = %route.tier,
                    default_unit_cost = self.default_unit_cost,
                    "Routed backend has no unit cost, default cost applies"
                );
            }
        }

        Ok(())
    }

    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::from_entries(self.default_backend.as_str(), self.routes.iter().cloned())
    }

    pub fn cost_table(&self) -> CostTable {
        let mut table = CostTable::new(self.default_unit_cost);
        for (backend, cost) in &self.unit_costs {
            table.insert(BackendId::new(backend.as_str()), *cost);
        }
        table
    }

    pub fn build_router(&self, ledger: Arc<CostLedger>) -> TaskRouter {
        TaskRouter::new(self.routing_table(), self.cost_table(), ledger)
            .with_baseline_cost(self.baseline_cost_per_request)
    }

    /// Settings for a step, with the per-request token default applied
    pub fn tool_settings(&self, step: &str) -> Option<ToolSettings> {
        self.tools.get(step).map(|tool| {
            let mut tool = tool.clone();
            tool.estimated_tokens.get_or_insert(self.tokens_per_request);
            tool
        })
    }
}

fn ensure_cost(name: &str, cost: f64) -> Result<()> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(())
    } else {
        Err(AutopilotError::configuration(
            "routing",
            format!("{name} must be a non-negative number, got {cost}"),
        ))
    }
}

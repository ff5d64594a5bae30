//! # System Constants
//!
//! Status enums, step and flag names, and the default values that bound the
//! routing and history behaviour of the autopilot core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Success,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Running => "running",
            WorkflowStatus::Success => "success",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Running)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failed,
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Success => "success",
            StepOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step names of the standard workflow definitions
pub mod steps {
    pub const TERRAFORM_VALIDATION: &str = "terraform_validation";
    pub const SECURITY_SCAN: &str = "security_scan";
    pub const DRIFT_DETECTION: &str = "drift_detection";
    pub const DOCKERFILE_ANALYSIS: &str = "dockerfile_analysis";
    pub const IMAGE_SCAN: &str = "image_scan";
    pub const MANIFEST_VALIDATION: &str = "manifest_validation";
    pub const POLICY_CHECK: &str = "policy_check";
}

/// Caller-supplied flags that enable optional steps
pub mod flags {
    pub const ENABLE_SECURITY_SCAN: &str = "enable_security_scan";
    pub const ENABLE_DRIFT_DETECTION: &str = "enable_drift_detection";
    pub const SCAN_IMAGE: &str = "scan_image";
    pub const CHECK_POLICIES: &str = "check_policies";
}

/// Named workflow parameters substituted into tool commands
pub mod parameters {
    pub const IMAGE_NAME: &str = "image_name";
}

/// Sandbox images known to carry the analysis tooling
pub mod images {
    pub const PROD_BASE: &str = "prod-base";
    pub const PROD_NODE: &str = "prod-node";
    pub const PY_APP: &str = "blaxel/py-app:latest";
}

/// Routing and accounting defaults
pub mod defaults {
    /// Smallest history window the store accepts
    pub const MIN_HISTORY_CAPACITY: usize = 10;
    pub const HISTORY_CAPACITY: usize = 10;
    /// Cached tool payloads kept before the oldest is evicted
    pub const CACHE_CAPACITY: usize = 256;
    pub const DEFAULT_BACKEND: &str = "gpt-4o-mini";
    /// Unit cost (per 1000 tokens) for backends missing from the cost table
    pub const DEFAULT_UNIT_COST: f64 = 0.001;
    /// Per-request cost of the comparison baseline used for savings reporting
    pub const BASELINE_COST_PER_REQUEST: f64 = 0.02;
    pub const TOKENS_PER_REQUEST: u64 = 1500;
    /// Token count used when quoting a route
    pub const QUOTE_TOKENS: u64 = 1000;
    pub const STEP_TIMEOUT_MS: u64 = 120_000;
}

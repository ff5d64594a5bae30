//! # Orchestration Types
//!
//! Workflow types, invocation parameters and the records produced by a
//! workflow execution.
//!
//! A [`WorkflowRecord`] is created when an execution starts, mutated only by
//! the sequencer while steps complete, finalized exactly once, and then
//! handed to the history store as an immutable value.

use crate::constants::{StepOutcome, WorkflowStatus};
use crate::error::{AutopilotError, StepError, StepErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Kinds of validation workflow the autopilot runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    InfrastructureValidation,
    ContainerAnalysis,
    K8sValidation,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 3] = [
        WorkflowType::InfrastructureValidation,
        WorkflowType::ContainerAnalysis,
        WorkflowType::K8sValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::InfrastructureValidation => "infrastructure_validation",
            WorkflowType::ContainerAnalysis => "container_analysis",
            WorkflowType::K8sValidation => "k8s_validation",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = AutopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowType::ALL
            .into_iter()
            .find(|workflow_type| workflow_type.as_str() == s.trim())
            .ok_or_else(|| AutopilotError::Validation(format!("Unknown workflow type: {s}")))
    }
}

/// Caller input for one workflow execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowParams {
    /// Primary content: Terraform code, Dockerfile or manifest
    pub content: String,
    /// Named flags enabling optional steps
    #[serde(default)]
    pub flags: HashMap<String, bool>,
    /// Named values substituted into tool commands
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl WorkflowParams {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.flags.insert(name.into(), enabled);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub outcome: StepOutcome,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StepErrorKind>,
}

impl StepRecord {
    pub fn succeeded(
        step: impl Into<String>,
        duration: Duration,
        result: serde_json::Value,
    ) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Success,
            duration,
            result: Some(result),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(step: impl Into<String>, duration: Duration, error: &StepError) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Failed,
            duration,
            result: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == StepOutcome::Success
    }
}

/// Full account of one workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: Uuid,
    pub workflow_type: WorkflowType,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub steps: Vec<StepRecord>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub total_duration: Duration,
    /// Description of the mandatory step failure that ended the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowRecord {
    pub(crate) fn start(workflow_type: WorkflowType) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            workflow_type,
            started_at: Utc::now(),
            completed_at: None,
            status: WorkflowStatus::Running,
            steps: Vec::new(),
            total_duration: Duration::ZERO,
            error: None,
        }
    }

    pub(crate) fn push_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub(crate) fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error.into());
    }

    /// Set the terminal status and completion time. Calling it again on a
    /// finalized record has no effect.
    pub(crate) fn finalize(&mut self) {
        if self.completed_at.is_some() {
            return;
        }
        if self.status == WorkflowStatus::Running {
            self.status = WorkflowStatus::Success;
        }
        let completed_at = Utc::now();
        self.total_duration = (completed_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        self.completed_at = Some(completed_at);
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == WorkflowStatus::Failed
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|step| step.step == name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.step.as_str()).collect()
    }
}

/// Durations serialized as fractional milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if millis.is_finite() && millis >= 0.0 {
            Ok(Duration::from_secs_f64(millis / 1000.0))
        } else {
            Ok(Duration::ZERO)
        }
    }
}

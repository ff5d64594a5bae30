//! # Workflow Definitions
//!
//! Ordered, immutable step lists for each workflow type. Step order is part of
//! the contract: the sequencer executes and records steps exactly in the
//! order they were declared here.
//!
//! ## Standard workflows
//!
//! | workflow | steps |
//! |---|---|
//! | infrastructure_validation | terraform_validation, security_scan?, drift_detection? |
//! | container_analysis | dockerfile_analysis, image_scan? |
//! | k8s_validation | manifest_validation, policy_check? |
//!
//! `?` marks an optional step gated by a caller flag.

use crate::constants::{flags, steps};
use crate::error::{AutopilotError, Result};
use crate::orchestration::step_executor::StepExecutor;
use crate::orchestration::types::{WorkflowParams, WorkflowType};
use std::fmt;
use std::sync::Arc;

/// Whether a step runs for a given invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepGate {
    Always,
    /// Runs when the named flag is true; `default` applies when the caller
    /// did not pass the flag
    Flag { name: String, default: bool },
}

impl StepGate {
    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        StepGate::Flag {
            name: name.into(),
            default,
        }
    }

    pub fn is_open(&self, params: &WorkflowParams) -> bool {
        match self {
            StepGate::Always => true,
            StepGate::Flag { name, default } => params.flag(name).unwrap_or(*default),
        }
    }
}

#[derive(Clone)]
pub struct WorkflowStep {
    name: String,
    mandatory: bool,
    gate: StepGate,
    executor: Arc<dyn StepExecutor>,
}

impl WorkflowStep {
    pub fn mandatory(name: impl Into<String>, executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            name: name.into(),
            mandatory: true,
            gate: StepGate::Always,
            executor,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        gate: StepGate,
        executor: Arc<dyn StepExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            mandatory: false,
            gate,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn gate(&self) -> &StepGate {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<dyn StepExecutor> {
        &self.executor
    }

    pub fn is_enabled(&self, params: &WorkflowParams) -> bool {
        self.gate.is_open(params)
    }
}

impl fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("name", &self.name)
            .field("mandatory", &self.mandatory)
            .field("gate", &self.gate)
            .field("executor", &self.executor.executor_name())
            .finish()
    }
}

/// Declared layout of a step, before an executor is bound to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLayout {
    pub name: &'static str,
    pub mandatory: bool,
    /// Enabling flag and its default, for optional steps
    pub flag: Option<(&'static str, bool)>,
}

const fn mandatory_step(name: &'static str) -> StepLayout {
    StepLayout {
        name,
        mandatory: true,
        flag: None,
    }
}

const fn optional_step(name: &'static str, flag: &'static str, default: bool) -> StepLayout {
    StepLayout {
        name,
        mandatory: false,
        flag: Some((flag, default)),
    }
}

const INFRASTRUCTURE_LAYOUT: [StepLayout; 3] = [
    mandatory_step(steps::TERRAFORM_VALIDATION),
    optional_step(steps::SECURITY_SCAN, flags::ENABLE_SECURITY_SCAN, true),
    optional_step(steps::DRIFT_DETECTION, flags::ENABLE_DRIFT_DETECTION, false),
];

const CONTAINER_LAYOUT: [StepLayout; 2] = [
    mandatory_step(steps::DOCKERFILE_ANALYSIS),
    optional_step(steps::IMAGE_SCAN, flags::SCAN_IMAGE, false),
];

const K8S_LAYOUT: [StepLayout; 2] = [
    mandatory_step(steps::MANIFEST_VALIDATION),
    optional_step(steps::POLICY_CHECK, flags::CHECK_POLICIES, true),
];

/// Standard step layout of a workflow type
pub fn standard_layout(workflow_type: WorkflowType) -> &'static [StepLayout] {
    match workflow_type {
        WorkflowType::InfrastructureValidation => &INFRASTRUCTURE_LAYOUT,
        WorkflowType::ContainerAnalysis => &CONTAINER_LAYOUT,
        WorkflowType::K8sValidation => &K8S_LAYOUT,
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    workflow_type: WorkflowType,
    steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    pub fn new(workflow_type: WorkflowType, steps: Vec<WorkflowStep>) -> Self {
        Self {
            workflow_type,
            steps,
        }
    }

    /// Build the standard definition, binding each step to the executor
    /// `resolve` returns for its name
    pub fn standard<F>(workflow_type: WorkflowType, resolve: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<Arc<dyn StepExecutor>>,
    {
        let steps = standard_layout(workflow_type)
            .iter()
            .map(|layout| {
                let executor =
                    resolve(layout.name).ok_or_else(|| AutopilotError::MissingExecutor {
                        workflow_type: workflow_type.to_string(),
                        step: layout.name.to_string(),
                    })?;

                Ok(match layout.flag {
                    Some((flag, default)) if !layout.mandatory => {
                        WorkflowStep::optional(layout.name, StepGate::flag(flag, default), executor)
                    }
                    _ => WorkflowStep::mandatory(layout.name, executor),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(workflow_type, steps))
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(WorkflowStep::name).collect()
    }
}

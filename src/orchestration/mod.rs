//! # Workflow Orchestration
//!
//! Sequential execution of validation workflows over pluggable step executors.
//!
//! ## Core Components
//!
//! - **WorkflowDefinition**: ordered mandatory and flag-gated optional steps
//! - **WorkflowSequencer**: runs a definition, captures per-step outcomes and
//!   applies the mandatory/optional failure policy
//! - **HistoryStore**: bounded window of finished records with lifetime counters
//! - **DevOpsAutopilot**: the wired entry point for the standard workflows

pub mod autopilot;
pub mod history_store;
pub mod step_executor;
pub mod types;
pub mod workflow_definition;
pub mod workflow_sequencer;

pub use autopilot::{AutopilotSummary, DevOpsAutopilot};
pub use history_store::{HistoryStore, HistorySummary, LifetimeCounters};
pub use step_executor::{step_fn, FnStepExecutor, StepContext, StepExecutor};
pub use types::{StepRecord, WorkflowParams, WorkflowRecord, WorkflowType};
pub use workflow_definition::{
    standard_layout, StepGate, StepLayout, WorkflowDefinition, WorkflowStep,
};
pub use workflow_sequencer::WorkflowSequencer;

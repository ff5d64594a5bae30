#![allow(clippy::doc_markdown)] // Allow technical terms like Terraform, Kubernetes in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DevOps Autopilot Core
//!
//! Orchestration core for sandboxed DevOps validation workflows.
//!
//! ## Overview
//!
//! The autopilot validates infrastructure code, container builds and
//! Kubernetes manifests by running ordered analysis steps inside isolated
//! sandboxes. Every step is routed to a compute backend chosen by task
//! category and complexity, and the spend is accounted in a cost ledger.
//!
//! ## Architecture
//!
//! - **Task Router** selects a backend for each `(category, tier)` pair,
//!   estimates cost and records usage
//! - **Cost Ledger** holds cumulative spend and request counts
//! - **Sandbox Execution Port** is the external acquire/run/release capability
//! - **Workflow Sequencer** runs mandatory and optional steps in order and
//!   captures every outcome
//! - **History Store** keeps a bounded window of finished workflows
//!
//! ## Module Organization
//!
//! - [`routing`] - Backend selection, cost estimation and the cost ledger
//! - [`sandbox`] - Sandbox port, scoped leases and acquisition accounting
//! - [`orchestration`] - Workflow definitions, sequencer, history and the autopilot
//! - [`tools`] - Sandboxed analysis tools and the result cache
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autopilot_core::{AutopilotConfig, DevOpsAutopilot, SandboxPort};
//! use std::sync::Arc;
//!
//! # async fn example(port: Arc<dyn SandboxPort>) -> autopilot_core::Result<()> {
//! autopilot_core::logging::init_structured_logging();
//!
//! let autopilot = DevOpsAutopilot::new(AutopilotConfig::default(), port)?;
//! let record = autopilot
//!     .execute_container_analysis("FROM node:20-alpine", Some("node:20-alpine"))
//!     .await;
//!
//! for step in &record.steps {
//!     println!("{}: {}", step.step, step.outcome);
//! }
//! println!("{:?}", autopilot.history_summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                          # Unit tests
//! cargo test                                # All tests
//! cargo bench --features benchmarks         # Routing benchmarks
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod routing;
pub mod sandbox;
pub mod tools;

pub use self::config::AutopilotConfig;
pub use constants::{StepOutcome, WorkflowStatus};
pub use error::{AutopilotError, Result, SandboxError, StepError, StepErrorKind};
pub use orchestration::{
    AutopilotSummary, DevOpsAutopilot, HistoryStore, HistorySummary, StepContext, StepExecutor,
    StepRecord, WorkflowDefinition, WorkflowParams, WorkflowRecord, WorkflowSequencer,
    WorkflowType,
};
pub use routing::{
    BackendId, ComplexityTier, CostLedger, RouteExplanation, TaskCategory, TaskRouter, UsageStats,
};
pub use sandbox::{ExecOutput, ResourceHints, SandboxHandle, SandboxPort};
pub use tools::{ResultCache, SandboxTool, ToolSettings};

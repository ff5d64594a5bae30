//! # Workflow Sequencer
//!
//! Runs a [`WorkflowDefinition`] step by step and produces a finalized
//! [`WorkflowRecord`].
//!
//! ## Execution contract
//!
//! - Steps run sequentially in declared order; disabled optional steps are
//!   skipped without a record.
//! - Every executed step is timed and recorded, successful or not.
//! - A failed mandatory step marks the workflow failed and stops the
//!   sequence. Steps already recorded stay in the record.
//! - A failed optional step is recorded and the sequence continues; the
//!   workflow status is not affected.
//! - Executor errors and panics are captured into the record. `run` itself
//!   never fails.
//!
//! Finalized records are appended to the shared [`HistoryStore`].

use crate::error::StepError;
use crate::logging::{log_step_operation, log_workflow_operation};
use crate::orchestration::history_store::HistoryStore;
use crate::orchestration::step_executor::StepContext;
use crate::orchestration::types::{StepRecord, WorkflowParams, WorkflowRecord};
use crate::orchestration::workflow_definition::{WorkflowDefinition, WorkflowStep};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct WorkflowSequencer {
    history: Arc<HistoryStore>,
}

impl WorkflowSequencer {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    #[instrument(skip_all, fields(workflow_type = %definition.workflow_type()))]
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        params: &WorkflowParams,
    ) -> WorkflowRecord {
        let mut record = WorkflowRecord::start(definition.workflow_type());
        let workflow_type = definition.workflow_type().as_str();

        log_workflow_operation(
            "start",
            Some(record.workflow_id),
            Some(workflow_type),
            record.status.as_str(),
            None,
        );

        for step in definition.steps() {
            if !step.is_enabled(params) {
                debug!(
                    workflow_id = %record.workflow_id,
                    step = step.name(),
                    "Optional step disabled, skipping"
                );
                continue;
            }

            let context = StepContext::new(
                record.workflow_id,
                definition.workflow_type(),
                step.name(),
                params,
            );

            let started = Instant::now();
            let outcome = Self::execute_step(step, &context).await;
            let duration = started.elapsed();

            match outcome {
                Ok(payload) => {
                    log_step_operation(
                        "execute",
                        Some(record.workflow_id),
                        step.name(),
                        "success",
                        None,
                    );
                    record.push_step(StepRecord::succeeded(step.name(), duration, payload));
                }
                Err(error) => {
                    let description = error.to_string();
                    log_step_operation(
                        "execute",
                        Some(record.workflow_id),
                        step.name(),
                        "failed",
                        Some(&description),
                    );
                    record.push_step(StepRecord::failed(step.name(), duration, &error));

                    if step.is_mandatory() {
                        warn!(
                            workflow_id = %record.workflow_id,
                            step = step.name(),
                            error = %description,
                            "Mandatory step failed, halting workflow"
                        );
                        record.mark_failed(format!(
                            "Mandatory step '{}' failed: {description}",
                            step.name()
                        ));
                        break;
                    }

                    warn!(
                        workflow_id = %record.workflow_id,
                        step = step.name(),
                        error = %description,
                        "Optional step failed, continuing"
                    );
                }
            }
        }

        record.finalize();

        info!(
            workflow_id = %record.workflow_id,
            status = %record.status,
            steps = record.steps.len(),
            duration_ms = record.total_duration.as_millis() as u64,
            "Workflow finished"
        );
        log_workflow_operation(
            "finish",
            Some(record.workflow_id),
            Some(workflow_type),
            record.status.as_str(),
            record.error.as_deref(),
        );

        self.history.record(record.clone());
        record
    }

    async fn execute_step(
        step: &WorkflowStep,
        context: &StepContext,
    ) -> Result<serde_json::Value, StepError> {
        match AssertUnwindSafe(step.executor().execute(context))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(StepError::Panicked {
                message: panic_message(&*panic),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

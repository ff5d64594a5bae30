//! # Step Executor
//!
//! The seam between the workflow sequencer and the collaborators that do the
//! actual work of a step. The sequencer hands each executor a [`StepContext`]
//! and stores whatever JSON payload comes back without interpreting it.

use crate::error::StepError;
use crate::orchestration::types::{WorkflowParams, WorkflowType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a step needs to know about the workflow it runs in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    pub workflow_id: Uuid,
    pub workflow_type: WorkflowType,
    pub step_name: String,
    pub content: String,
    pub parameters: HashMap<String, String>,
}

impl StepContext {
    pub fn new(
        workflow_id: Uuid,
        workflow_type: WorkflowType,
        step_name: impl Into<String>,
        params: &WorkflowParams,
    ) -> Self {
        Self {
            workflow_id,
            workflow_type,
            step_name: step_name.into(),
            content: params.content.clone(),
            parameters: params.parameters.clone(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// Collaborator operation behind a workflow step
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Name used in logs
    fn executor_name(&self) -> &str;

    async fn execute(&self, context: &StepContext) -> Result<serde_json::Value, StepError>;
}

/// Adapter turning an async closure into a [`StepExecutor`]
pub struct FnStepExecutor<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnStepExecutor<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, StepError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> StepExecutor for FnStepExecutor<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, StepError>> + Send + 'static,
{
    fn executor_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, context: &StepContext) -> Result<serde_json::Value, StepError> {
        (self.f)(context.clone()).await
    }
}

/// Shorthand for `Arc::new(FnStepExecutor::new(name, f))`
pub fn step_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn StepExecutor>
where
    F: Fn(StepContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, StepError>> + Send + 'static,
{
    Arc::new(FnStepExecutor::new(name, f))
}

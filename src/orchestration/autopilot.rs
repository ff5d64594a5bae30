//! # DevOps Autopilot
//!
//! Entry point wiring configuration, routing, cost accounting, history and
//! the sandbox port into the three standard validation workflows.
//!
//! Every `execute_*` method returns a finalized [`WorkflowRecord`]; step and
//! sandbox failures are reported inside the record, never as an `Err`.
//!
//! ```rust,no_run
//! use autopilot_core::{AutopilotConfig, DevOpsAutopilot, SandboxPort};
//! use std::sync::Arc;
//!
//! # async fn example(port: Arc<dyn SandboxPort>) -> autopilot_core::Result<()> {
//! let autopilot = DevOpsAutopilot::new(AutopilotConfig::load()?, port)?;
//!
//! let record = autopilot
//!     .execute_infrastructure_validation("resource \"aws_s3_bucket\" \"logs\" {}", true, false)
//!     .await;
//! println!("{} finished with {}", record.workflow_id, record.status);
//! println!("{:?}", autopilot.usage_stats());
//! # Ok(())
//! # }
//! ```

use crate::config::AutopilotConfig;
use crate::constants::{flags, parameters};
use crate::error::Result;
use crate::orchestration::history_store::{HistoryStore, HistorySummary};
use crate::orchestration::step_executor::StepExecutor;
use crate::orchestration::types::{WorkflowParams, WorkflowRecord, WorkflowType};
use crate::orchestration::workflow_definition::WorkflowDefinition;
use crate::orchestration::workflow_sequencer::WorkflowSequencer;
use crate::routing::{
    ComplexityTier, CostLedger, RouteExplanation, TaskCategory, TaskRouter, UsageStats,
};
use crate::sandbox::{SandboxPort, TrackedSandboxPort};
use crate::tools::{ResultCache, SandboxTool};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// History summary extended with spend and sandbox usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotSummary {
    #[serde(flatten)]
    pub history: HistorySummary,
    pub total_cost: f64,
    /// Successful sandbox acquisitions per image
    pub sandbox_images_used: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
struct Definitions {
    infrastructure: WorkflowDefinition,
    container: WorkflowDefinition,
    k8s: WorkflowDefinition,
}

impl Definitions {
    fn get(&self, workflow_type: WorkflowType) -> &WorkflowDefinition {
        match workflow_type {
            WorkflowType::InfrastructureValidation => &self.infrastructure,
            WorkflowType::ContainerAnalysis => &self.container,
            WorkflowType::K8sValidation => &self.k8s,
        }
    }

    fn slot(&mut self, workflow_type: WorkflowType) -> &mut WorkflowDefinition {
        match workflow_type {
            WorkflowType::InfrastructureValidation => &mut self.infrastructure,
            WorkflowType::ContainerAnalysis => &mut self.container,
            WorkflowType::K8sValidation => &mut self.k8s,
        }
    }
}

pub struct DevOpsAutopilot {
    config: AutopilotConfig,
    router: Arc<TaskRouter>,
    sandbox: Arc<TrackedSandboxPort>,
    cache: Arc<ResultCache>,
    sequencer: WorkflowSequencer,
    definitions: Definitions,
}

impl DevOpsAutopilot {
    /// Build an autopilot whose steps run the configured tools through `port`
    pub fn new(config: AutopilotConfig, port: Arc<dyn SandboxPort>) -> Result<Self> {
        config.validate()?;

        let sandbox = Arc::new(TrackedSandboxPort::new(port));
        let router = Arc::new(config.build_router(Arc::new(CostLedger::new())));
        let cache = Arc::new(
            ResultCache::new(config.cache_enabled).with_capacity(config.cache_capacity),
        );
        let history = Arc::new(HistoryStore::new(config.history_capacity));

        let tool_port: Arc<dyn SandboxPort> = sandbox.clone();
        let resolve = |step: &str| -> Option<Arc<dyn StepExecutor>> {
            let settings = config.tool_settings(step)?;
            let tool: Arc<dyn StepExecutor> = Arc::new(SandboxTool::new(
                step,
                settings,
                Arc::clone(&router),
                Arc::clone(&tool_port),
                Arc::clone(&cache),
            ));
            Some(tool)
        };

        let definitions = Definitions {
            infrastructure: WorkflowDefinition::standard(
                WorkflowType::InfrastructureValidation,
                &resolve,
            )?,
            container: WorkflowDefinition::standard(WorkflowType::ContainerAnalysis, &resolve)?,
            k8s: WorkflowDefinition::standard(WorkflowType::K8sValidation, &resolve)?,
        };

        info!(
            provider = sandbox.provider_name(),
            history_capacity = history.capacity(),
            routes = router.routing_table().len(),
            cache_enabled = cache.is_enabled(),
            cache_capacity = cache.capacity(),
            "DevOps autopilot initialized"
        );

        Ok(Self {
            config,
            router,
            sandbox,
            cache,
            sequencer: WorkflowSequencer::new(history),
            definitions,
        })
    }

    /// Replace the definition used for its workflow type
    pub fn with_definition(mut self, definition: WorkflowDefinition) -> Self {
        let workflow_type = definition.workflow_type();
        *self.definitions.slot(workflow_type) = definition;
        self
    }

    /// Terraform validation, then the security scan and drift detection
    /// when enabled
    #[instrument(skip(self, terraform_code))]
    pub async fn execute_infrastructure_validation(
        &self,
        terraform_code: &str,
        enable_security_scan: bool,
        enable_drift_detection: bool,
    ) -> WorkflowRecord {
        let params = WorkflowParams::new(terraform_code)
            .with_flag(flags::ENABLE_SECURITY_SCAN, enable_security_scan)
            .with_flag(flags::ENABLE_DRIFT_DETECTION, enable_drift_detection);

        self.execute(WorkflowType::InfrastructureValidation, params).await
    }

    /// Dockerfile analysis, then an image scan when a non-blank `image_name`
    /// is given
    #[instrument(skip(self, dockerfile))]
    pub async fn execute_container_analysis(
        &self,
        dockerfile: &str,
        image_name: Option<&str>,
    ) -> WorkflowRecord {
        let image_name = image_name.filter(|name| !name.trim().is_empty());
        let mut params =
            WorkflowParams::new(dockerfile).with_flag(flags::SCAN_IMAGE, image_name.is_some());
        if let Some(image_name) = image_name {
            params = params.with_parameter(parameters::IMAGE_NAME, image_name);
        }

        self.execute(WorkflowType::ContainerAnalysis, params).await
    }

    /// Manifest validation, then policy checks when enabled
    #[instrument(skip(self, manifest))]
    pub async fn execute_k8s_validation(
        &self,
        manifest: &str,
        check_policies: bool,
    ) -> WorkflowRecord {
        let params =
            WorkflowParams::new(manifest).with_flag(flags::CHECK_POLICIES, check_policies);

        self.execute(WorkflowType::K8sValidation, params).await
    }

    pub async fn execute(
        &self,
        workflow_type: WorkflowType,
        params: WorkflowParams,
    ) -> WorkflowRecord {
        self.sequencer
            .run(self.definitions.get(workflow_type), &params)
            .await
    }

    /// Run several workflows concurrently. Records come back in request order.
    pub async fn execute_batch(
        &self,
        requests: Vec<(WorkflowType, WorkflowParams)>,
    ) -> Vec<WorkflowRecord> {
        join_all(
            requests
                .into_iter()
                .map(|(workflow_type, params)| self.execute(workflow_type, params)),
        )
        .await
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.router.usage_stats()
    }

    pub fn history_summary(&self) -> AutopilotSummary {
        AutopilotSummary {
            history: self.sequencer.history().summary(),
            total_cost: self.usage_stats().total_cost,
            sandbox_images_used: self.sandbox.images_used(),
        }
    }

    pub fn explain_route(&self, category: TaskCategory, tier: ComplexityTier) -> RouteExplanation {
        self.router.explain_route(category, tier)
    }

    pub fn definition(&self, workflow_type: WorkflowType) -> &WorkflowDefinition {
        self.definitions.get(workflow_type)
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn router(&self) -> &Arc<TaskRouter> {
        &self.router
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        self.sequencer.history()
    }

    pub fn sandbox(&self) -> &Arc<TrackedSandboxPort> {
        &self.sandbox
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }
}

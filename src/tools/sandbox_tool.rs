//! # Sandbox-Backed Tool Executor
//!
//! A [`SandboxTool`] runs one analysis command inside a freshly acquired
//! sandbox and turns its output into a step payload.
//!
//! ## Execution order
//!
//! 1. Validate input: blank content and missing or malformed command
//!    parameters fail with `MalformedInput` before any sandbox is touched
//! 2. Return a cached payload when the same input was already analysed
//! 3. Acquire a sandbox, write the workspace file, run the command under the
//!    configured timeout, release the sandbox
//! 4. Charge one request on the routed backend to the cost ledger
//! 5. Reject exit codes outside `accepted_exit_codes`
//!
//! The sandbox is released on every path, including failures and panics.

use super::cache::ResultCache;
use crate::constants::defaults;
use crate::error::StepError;
use crate::logging::log_sandbox_operation;
use crate::orchestration::step_executor::{StepContext, StepExecutor};
use crate::routing::{BackendId, ComplexityTier, TaskCategory, TaskRouter};
use crate::sandbox::{ExecOutput, ResourceHints, SandboxLease, SandboxPort};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Placeholder substituted with the tool's workspace file path
const INPUT_PATH_PLACEHOLDER: &str = "input_path";

/// Longest stderr/stdout excerpt kept in a failure message
const MAX_ERROR_DETAIL_CHARS: usize = 500;

const MAX_PARAMETER_LEN: usize = 255;

/// Static description of one sandboxed analysis tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub category: TaskCategory,
    pub tier: ComplexityTier,
    pub image: String,
    #[serde(default)]
    pub resources: ResourceHints,
    /// Where the workflow content is written before the command runs. No
    /// file is written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    /// Shell command; `{name}` placeholders are filled from workflow
    /// parameters, `{input_path}` from `input_path`
    pub command: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_accepted_exit_codes")]
    pub accepted_exit_codes: Vec<i32>,
    /// Tokens charged to the routed backend per execution. Unset means the
    /// configured per-request default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    defaults::STEP_TIMEOUT_MS
}

fn default_accepted_exit_codes() -> Vec<i32> {
    vec![0]
}

impl ToolSettings {
    pub fn new(
        category: TaskCategory,
        tier: ComplexityTier,
        image: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            category,
            tier,
            image: image.into(),
            resources: ResourceHints::default(),
            input_path: None,
            command: command.into(),
            timeout_ms: default_timeout_ms(),
            accepted_exit_codes: default_accepted_exit_codes(),
            estimated_tokens: None,
        }
    }

    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_resources(mut self, resources: ResourceHints) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_accepted_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.accepted_exit_codes = codes;
        self
    }

    pub fn with_estimated_tokens(mut self, tokens: u64) -> Self {
        self.estimated_tokens = Some(tokens);
        self
    }

    pub fn tokens_per_run(&self) -> u64 {
        self.estimated_tokens.unwrap_or(defaults::TOKENS_PER_REQUEST)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn accepts(&self, exit_code: i32) -> bool {
        self.accepted_exit_codes.contains(&exit_code)
    }
}

pub struct SandboxTool {
    name: String,
    settings: ToolSettings,
    router: Arc<TaskRouter>,
    port: Arc<dyn SandboxPort>,
    cache: Arc<ResultCache>,
}

impl SandboxTool {
    pub fn new(
        name: impl Into<String>,
        settings: ToolSettings,
        router: Arc<TaskRouter>,
        port: Arc<dyn SandboxPort>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            router,
            port,
            cache,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Fill `{placeholder}`s in the command template
    pub fn render_command(&self, context: &StepContext) -> Result<String, StepError> {
        let template = self.settings.command.as_str();
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| {
                StepError::malformed(format!("Unterminated placeholder in command: {template}"))
            })?;
            let name = &after[..end];

            let value = match (name, self.settings.input_path.as_deref()) {
                (INPUT_PATH_PLACEHOLDER, Some(path)) => path,
                _ => context
                    .parameter(name)
                    .ok_or_else(|| StepError::malformed(format!("Missing parameter '{name}'")))?,
            };
            validate_parameter(name, value)?;

            rendered.push_str(value);
            rest = &after[end + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }

    async fn run_in_sandbox(&self, command: &str, content: &str) -> Result<ExecOutput, StepError> {
        let started = Instant::now();
        let lease = SandboxLease::acquire(
            Arc::clone(&self.port),
            &self.settings.image,
            &self.settings.resources,
        )
        .await?;
        let sandbox_id = lease.handle().id().to_string();
        log_sandbox_operation("acquire", &self.settings.image, Some(&sandbox_id), "success", None);

        let result = self.exec(&lease, command, content).await;

        if let Err(err) = lease.release().await {
            warn!(tool = %self.name, sandbox = %sandbox_id, error = %err, "Sandbox release failed");
        }
        log_sandbox_operation(
            "release",
            &self.settings.image,
            Some(&sandbox_id),
            if result.is_ok() { "success" } else { "failed" },
            Some(started.elapsed().as_millis() as u64),
        );

        result
    }

    async fn exec(
        &self,
        lease: &SandboxLease,
        command: &str,
        content: &str,
    ) -> Result<ExecOutput, StepError> {
        if let Some(path) = self.settings.input_path.as_deref() {
            lease.write_file(path, content).await?;
        }

        let timeout = self.settings.timeout();
        match tokio::time::timeout(timeout, lease.run(command, timeout)).await {
            Ok(output) => Ok(output?),
            Err(_elapsed) => Err(StepError::Timeout {
                operation: command.to_string(),
                timeout_ms: self.settings.timeout_ms,
            }),
        }
    }

    fn payload(&self, backend: &BackendId, cost: f64, output: &ExecOutput) -> Value {
        json!({
            "tool": self.name,
            "backend": backend,
            "sandbox_image": self.settings.image,
            "exit_code": output.exit_code,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "changes_detected": output.exit_code != 0,
            "estimated_cost": cost,
            "cached": false,
        })
    }
}

#[async_trait]
impl StepExecutor for SandboxTool {
    fn executor_name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, context: &StepContext) -> Result<Value, StepError> {
        if context.content.trim().is_empty() {
            return Err(StepError::malformed(format!(
                "{} received empty content",
                context.step_name
            )));
        }
        let command = self.render_command(context)?;

        let cache_key = ResultCache::key(&self.name, &command, &context.content);
        if let Some(payload) = self.cache.get(&cache_key) {
            debug!(
                tool = %self.name,
                step = %context.step_name,
                "Returning cached analysis result"
            );
            return Ok(payload);
        }

        let backend = self
            .router
            .select_backend(self.settings.category, self.settings.tier);
        let output = self.run_in_sandbox(&command, &context.content).await?;
        let cost = self.router.track_usage(&backend, self.settings.tokens_per_run());

        if !self.settings.accepts(output.exit_code) {
            let details = if output.stderr.trim().is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            return Err(StepError::NonZeroExit {
                exit_code: output.exit_code,
                details: truncate(details.trim(), MAX_ERROR_DETAIL_CHARS),
            });
        }

        let payload = self.payload(&backend, cost, &output);
        self.cache.insert(cache_key, payload.clone());
        Ok(payload)
    }
}

fn validate_parameter(name: &str, value: &str) -> Result<(), StepError> {
    let well_formed = !value.is_empty()
        && value.len() <= MAX_PARAMETER_LEN
        && !value.starts_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':' | '@'));

    if well_formed {
        Ok(())
    } else {
        Err(StepError::malformed(format!("Invalid value for '{name}': {value:?}")))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::parameters;
    use crate::error::{SandboxError, StepErrorKind};
    use crate::orchestration::types::{WorkflowParams, WorkflowType};
    use crate::sandbox::SandboxHandle;
    use parking_lot::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakePort {
        output: Mutex<ExecOutput>,
        delay: Mutex<Option<Duration>>,
        commands: Mutex<Vec<String>>,
        files: Mutex<Vec<(String, String)>>,
        acquired: Mutex<u32>,
        released: Mutex<u32>,
    }

    impl FakePort {
        fn returning(output: ExecOutput) -> Arc<Self> {
            let port = Self::default();
            *port.output.lock() = output;
            Arc::new(port)
        }
    }

    #[async_trait]
    impl SandboxPort for FakePort {
        async fn acquire(
            &self,
            image: &str,
            _hints: &ResourceHints,
        ) -> Result<SandboxHandle, SandboxError> {
            *self.acquired.lock() += 1;
            Ok(SandboxHandle::new("sbx", image))
        }

        async fn run(
            &self,
            _handle: &SandboxHandle,
            command: &str,
            _timeout: Duration,
        ) -> Result<ExecOutput, SandboxError> {
            self.commands.lock().push(command.to_string());
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.output.lock().clone())
        }

        async fn write_file(
            &self,
            _handle: &SandboxHandle,
            path: &str,
            content: &str,
        ) -> Result<(), SandboxError> {
            self.files.lock().push((path.to_string(), content.to_string()));
            Ok(())
        }

        async fn release(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
            *self.released.lock() += 1;
            Ok(())
        }
    }

    fn tool(
        settings: ToolSettings,
        port: Arc<FakePort>,
        cache: ResultCache,
    ) -> (SandboxTool, Arc<TaskRouter>) {
        let router = Arc::new(TaskRouter::with_defaults());
        let tool = SandboxTool::new(
            "hadolint",
            settings,
            Arc::clone(&router),
            port,
            Arc::new(cache),
        );
        (tool, router)
    }

    fn dockerfile_settings() -> ToolSettings {
        ToolSettings::new(
            TaskCategory::Docker,
            ComplexityTier::Moderate,
            "prod-node",
            "hadolint --format json {input_path}",
        )
        .with_input_path("/workspace/Dockerfile")
    }

    fn context(params: &WorkflowParams) -> StepContext {
        StepContext::new(
            Uuid::new_v4(),
            WorkflowType::ContainerAnalysis,
            "dockerfile_analysis",
            params,
        )
    }

    #[tokio::test]
    async fn test_successful_run_builds_payload_and_tracks_usage() {
        let port = FakePort::returning(ExecOutput::success("[]"));
        let (tool, router) = tool(dockerfile_settings(), port.clone(), ResultCache::default());

        let payload = tool
            .execute(&context(&WorkflowParams::new("FROM node:20")))
            .await
            .unwrap();

        assert_eq!(payload["tool"], json!("hadolint"));
        assert_eq!(payload["backend"], json!("gpt-4o"));
        assert_eq!(payload["sandbox_image"], json!("prod-node"));
        assert_eq!(payload["exit_code"], json!(0));
        assert_eq!(payload["cached"], json!(false));
        assert_eq!(
            *port.commands.lock(),
            vec!["hadolint --format json /workspace/Dockerfile".to_string()]
        );
        assert_eq!(
            *port.files.lock(),
            vec![("/workspace/Dockerfile".to_string(), "FROM node:20".to_string())]
        );
        assert_eq!(*port.released.lock(), 1);
        assert_eq!(router.usage_stats().total_requests, 1);
    }

    #[tokio::test]
    async fn test_rejected_exit_code_fails_after_release() {
        let port =
            FakePort::returning(ExecOutput::failure(1, "DL3007 Using latest is prone to errors"));
        let (tool, router) = tool(dockerfile_settings(), port.clone(), ResultCache::default());

        let err = tool
            .execute(&context(&WorkflowParams::new("FROM node:latest")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), StepErrorKind::ValidationFailed);
        assert!(err.to_string().contains("DL3007"));
        assert_eq!(*port.released.lock(), 1);
        assert_eq!(router.usage_stats().total_requests, 1);
    }

    #[tokio::test]
    async fn test_accepted_non_zero_exit_reports_changes() {
        let port = FakePort::returning(ExecOutput {
            stdout: "Plan: 1 to change".to_string(),
            stderr: String::new(),
            exit_code: 2,
        });
        let settings = ToolSettings::new(
            TaskCategory::Diff,
            ComplexityTier::Complex,
            "prod-base",
            "terraform plan -detailed-exitcode -no-color",
        )
        .with_accepted_exit_codes(vec![0, 2]);
        let (tool, _) = tool(settings, port, ResultCache::default());

        let payload = tool
            .execute(&context(&WorkflowParams::new("resource {}")))
            .await
            .unwrap();

        assert_eq!(payload["exit_code"], json!(2));
        assert_eq!(payload["changes_detected"], json!(true));
    }

    #[tokio::test]
    async fn test_blank_content_never_reaches_the_sandbox() {
        let port = FakePort::returning(ExecOutput::success(""));
        let (tool, router) = tool(dockerfile_settings(), port.clone(), ResultCache::default());

        let err = tool
            .execute(&context(&WorkflowParams::new("  \n")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), StepErrorKind::MalformedInput);
        assert_eq!(*port.acquired.lock(), 0);
        assert_eq!(router.usage_stats().total_requests, 0);
    }

    #[tokio::test]
    async fn test_parameters_are_validated_before_substitution() {
        let settings = ToolSettings::new(
            TaskCategory::Docker,
            ComplexityTier::Simple,
            "prod-base",
            "trivy image --format json {image_name}",
        );
        let port = FakePort::returning(ExecOutput::success("{}"));
        let (tool, _) = tool(settings, port.clone(), ResultCache::default());

        let missing = tool
            .execute(&context(&WorkflowParams::new("FROM alpine")))
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), StepErrorKind::MalformedInput);

        let injected = WorkflowParams::new("FROM alpine")
            .with_parameter(parameters::IMAGE_NAME, "alpine; rm -rf /");
        let err = tool.execute(&context(&injected)).await.unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::MalformedInput);
        assert_eq!(*port.acquired.lock(), 0);

        let valid = WorkflowParams::new("FROM alpine")
            .with_parameter(parameters::IMAGE_NAME, "registry.io/team/app:1.2.3");
        tool.execute(&context(&valid)).await.unwrap();
        assert_eq!(
            *port.commands.lock(),
            vec!["trivy image --format json registry.io/team/app:1.2.3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_slow_command_times_out_and_releases() {
        let port = FakePort::returning(ExecOutput::success(""));
        *port.delay.lock() = Some(Duration::from_millis(500));
        let (tool, router) = tool(
            dockerfile_settings().with_timeout_ms(20),
            port.clone(),
            ResultCache::default(),
        );

        let err = tool
            .execute(&context(&WorkflowParams::new("FROM node:20")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), StepErrorKind::Timeout);
        assert_eq!(*port.released.lock(), 1);
        assert_eq!(router.usage_stats().total_requests, 0);
    }

    #[tokio::test]
    async fn test_identical_input_is_served_from_cache() {
        let port = FakePort::returning(ExecOutput::success("[]"));
        let (tool, router) = tool(dockerfile_settings(), port.clone(), ResultCache::default());
        let params = WorkflowParams::new("FROM node:20");

        tool.execute(&context(&params)).await.unwrap();
        let second = tool.execute(&context(&params)).await.unwrap();

        assert_eq!(second["cached"], json!(true));
        assert_eq!(port.commands.lock().len(), 1);
        assert_eq!(router.usage_stats().total_requests, 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}

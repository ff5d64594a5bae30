//! Default analysis tools for the standard workflow steps.

use super::sandbox_tool::ToolSettings;
use crate::constants::{images, steps};
use crate::routing::{ComplexityTier, TaskCategory};
use crate::sandbox::ResourceHints;
use std::collections::BTreeMap;

const DRIFT_COMMAND: &str =
    "cd /workspace && terraform init -backend=false && terraform plan -detailed-exitcode -no-color";

/// Tool settings keyed by the step they execute
pub fn default_tool_settings() -> BTreeMap<String, ToolSettings> {
    use ComplexityTier::{Complex, Moderate, Simple};

    let tools = [
        (
            steps::TERRAFORM_VALIDATION,
            ToolSettings::new(
                TaskCategory::Terraform,
                Complex,
                images::PROD_BASE,
                "cd /workspace && terraform init -backend=false && terraform validate -json",
            )
            .with_input_path("/workspace/main.tf")
            .with_resources(ResourceHints::named("tf-validator").with_memory_mb(2048)),
        ),
        (
            steps::SECURITY_SCAN,
            ToolSettings::new(
                TaskCategory::Security,
                Moderate,
                images::PY_APP,
                "trivy config --format json /workspace",
            )
            .with_input_path("/workspace/main.tf")
            .with_resources(ResourceHints::named("security-scanner").with_memory_mb(2048)),
        ),
        (
            steps::DRIFT_DETECTION,
            ToolSettings::new(
                TaskCategory::Diff,
                Complex,
                images::PROD_BASE,
                DRIFT_COMMAND,
            )
            .with_input_path("/workspace/main.tf")
            .with_resources(ResourceHints::named("drift-detector").with_memory_mb(2048))
            .with_accepted_exit_codes(vec![0, 2]),
        ),
        (
            steps::DOCKERFILE_ANALYSIS,
            ToolSettings::new(
                TaskCategory::Docker,
                Moderate,
                images::PROD_NODE,
                "hadolint --format json {input_path}",
            )
            .with_input_path("/workspace/Dockerfile")
            .with_resources(ResourceHints::named("dockerfile-analyzer").with_memory_mb(1024)),
        ),
        (
            steps::IMAGE_SCAN,
            ToolSettings::new(
                TaskCategory::Docker,
                Simple,
                images::PROD_BASE,
                "trivy image --format json {image_name}",
            )
            .with_resources(ResourceHints::named("image-scanner").with_memory_mb(2048)),
        ),
        (
            steps::MANIFEST_VALIDATION,
            ToolSettings::new(
                TaskCategory::K8s,
                Moderate,
                images::PROD_BASE,
                "kubeconform -summary -output json {input_path}",
            )
            .with_input_path("/workspace/manifest.yaml")
            .with_resources(ResourceHints::named("k8s-validator").with_memory_mb(1024)),
        ),
        (
            steps::POLICY_CHECK,
            ToolSettings::new(
                TaskCategory::K8s,
                Complex,
                images::PROD_BASE,
                "kube-score score {input_path}",
            )
            .with_input_path("/workspace/manifest.yaml")
            .with_resources(ResourceHints::named("policy-checker").with_memory_mb(1024)),
        ),
    ];

    tools
        .into_iter()
        .map(|(step, settings)| (step.to_string(), settings))
        .collect()
}

//! Shared inputs and autopilot builders for integration tests.

use crate::mocks::MockSandbox;
use autopilot_core::{AutopilotConfig, DevOpsAutopilot, SandboxPort};
use std::sync::Arc;

pub const TERRAFORM_SAMPLE: &str = r#"
resource "aws_s3_bucket" "logs" {
  bucket = "autopilot-logs"
}
"#;

pub const DOCKERFILE_SAMPLE: &str = r#"FROM node:latest
RUN npm install
CMD ["node", "server.js"]
"#;

pub const MANIFEST_SAMPLE: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  containers:
    - name: web
      image: nginx:1.27
"#;

/// Autopilot with default configuration over `sandbox`
pub fn autopilot_with(sandbox: MockSandbox) -> (DevOpsAutopilot, Arc<MockSandbox>) {
    autopilot_with_config(AutopilotConfig::default(), sandbox)
}

pub fn autopilot_with_config(
    config: AutopilotConfig,
    sandbox: MockSandbox,
) -> (DevOpsAutopilot, Arc<MockSandbox>) {
    let sandbox = Arc::new(sandbox);
    let port: Arc<dyn SandboxPort> = sandbox.clone();
    let autopilot = DevOpsAutopilot::new(config, port).expect("default configuration is valid");
    (autopilot, sandbox)
}

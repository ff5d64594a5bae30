//! # Sandbox Execution Port
//!
//! The abstract capability every sandboxed step calls through. Implementations
//! own isolation, image management and transport; the orchestration core only
//! sees handles, command output and [`SandboxError`]s.

use crate::error::SandboxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Reference to an acquired sandbox
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SandboxHandle {
    id: String,
    image: String,
}

impl SandboxHandle {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image(&self) -> &str {
        &self.image
    }
}

impl fmt::Display for SandboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.image)
    }
}

/// Sizing and naming hints passed through to `acquire`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_millis: Option<u32>,
    /// Prefix for the sandbox name, e.g. `tf-validator`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
}

impl ResourceHints {
    pub fn named(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn with_memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }
}

/// Captured result of a command run inside a sandbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// External sandbox lifecycle capability
///
/// A timeout passed to `run` must surface as `SandboxError::Timeout`; the
/// sequencer treats it like any other step failure.
#[async_trait]
pub trait SandboxPort: Send + Sync {
    /// Provider name for logging
    fn provider_name(&self) -> &str {
        "sandbox"
    }

    async fn acquire(&self, image: &str, hints: &ResourceHints)
        -> Result<SandboxHandle, SandboxError>;

    async fn run(
        &self,
        handle: &SandboxHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError>;

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        content: &str,
    ) -> Result<(), SandboxError>;

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;
}

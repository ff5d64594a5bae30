//! # Error Types
//!
//! Structured error handling for the autopilot core using thiserror.
//!
//! Three layers of errors exist:
//! - [`SandboxError`]: failures reported by a sandbox execution port
//! - [`StepError`]: the per-step failure taxonomy recorded on a workflow record
//! - [`AutopilotError`]: setup and configuration failures surfaced to callers
//!
//! Step-level errors never escape a workflow entry point. They are folded
//! into the returned `WorkflowRecord` instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-level errors for configuration and wiring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutopilotError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No executor registered for step '{step}' of workflow {workflow_type}")]
    MissingExecutor { workflow_type: String, step: String },
}

impl AutopilotError {
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for AutopilotError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration("loader", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AutopilotError>;

/// Failures reported by a sandbox execution port
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
    #[error("Sandbox provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("Failed to acquire sandbox from image {image}: {message}")]
    AcquireFailed { image: String, message: String },

    #[error("Command timed out after {timeout_ms}ms: {command}")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("Command execution failed: {command}: {message}")]
    Exec { command: String, message: String },

    #[error("Failed to write {path}: {message}")]
    FileWrite { path: String, message: String },

    #[error("Failed to release sandbox {handle}: {message}")]
    Release { handle: String, message: String },
}

/// Serializable classification of a step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    Timeout,
    ValidationFailed,
    Unavailable,
    MalformedInput,
    Internal,
}

impl StepErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepErrorKind::Timeout => "timeout",
            StepErrorKind::ValidationFailed => "validation_failed",
            StepErrorKind::Unavailable => "unavailable",
            StepErrorKind::MalformedInput => "malformed_input",
            StepErrorKind::Internal => "internal",
        }
    }
}

/// Failure of a single workflow step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation failed with exit code {exit_code}: {details}")]
    NonZeroExit { exit_code: i32, details: String },

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("Step executor panicked: {message}")]
    Panicked { message: String },
}

impl StepError {
    pub fn kind(&self) -> StepErrorKind {
        match self {
            StepError::Timeout { .. } => StepErrorKind::Timeout,
            StepError::NonZeroExit { .. } => StepErrorKind::ValidationFailed,
            StepError::Unavailable { .. } => StepErrorKind::Unavailable,
            StepError::MalformedInput { .. } => StepErrorKind::MalformedInput,
            StepError::Panicked { .. } => StepErrorKind::Internal,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<SandboxError> for StepError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Timeout {
                command,
                timeout_ms,
            } => StepError::Timeout {
                operation: command,
                timeout_ms,
            },
            other => StepError::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

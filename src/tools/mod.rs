//! # Analysis Tools
//!
//! Step executors that run DevOps analysis tooling inside sandboxes.
//!
//! - **SandboxTool**: routed, cost-tracked, sandboxed command execution
//! - **ResultCache**: digest-keyed cache of successful payloads
//! - **catalog**: the default tool for every standard workflow step

pub mod cache;
pub mod catalog;
pub mod sandbox_tool;

pub use cache::ResultCache;
pub use catalog::default_tool_settings;
pub use sandbox_tool::{SandboxTool, ToolSettings};

//! # Sandbox Execution
//!
//! - **SandboxPort**: the external acquire/run/write_file/release capability
//! - **SandboxLease**: scoped acquisition with guaranteed release
//! - **TrackedSandboxPort**: per-image acquisition accounting

pub mod lease;
pub mod port;
pub mod tracked;

pub use lease::SandboxLease;
pub use port::{ExecOutput, ResourceHints, SandboxHandle, SandboxPort};
pub use tracked::TrackedSandboxPort;

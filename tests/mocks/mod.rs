#![allow(dead_code)]

pub mod mock_sandbox;

pub use mock_sandbox::{MockSandbox, SandboxCall};

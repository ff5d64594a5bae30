//! Mock Sandbox Implementation for Testing
//!
//! Scripted implementation of the SandboxPort trait. Commands are matched
//! against substring patterns in registration order; unmatched commands
//! succeed with empty output. Every call is recorded for assertions.

use async_trait::async_trait;
use autopilot_core::{ExecOutput, ResourceHints, SandboxError, SandboxHandle, SandboxPort};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded port interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    Acquire { image: String, name_prefix: Option<String> },
    WriteFile { sandbox: String, path: String, content: String },
    Run { sandbox: String, command: String },
    Release { sandbox: String },
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(ExecOutput),
    Error(SandboxError),
    Delayed(Duration, ExecOutput),
}

/// Mock sandbox state for tracking calls
#[derive(Debug, Default)]
pub struct MockSandboxState {
    pub calls: Vec<SandboxCall>,
    pub active: HashSet<String>,
    pub next_id: u64,
}

pub struct MockSandbox {
    state: Arc<Mutex<MockSandboxState>>,
    scripts: Vec<(String, Scripted)>,
    failing_images: HashMap<String, String>,
}

impl MockSandbox {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockSandboxState::default())),
            scripts: Vec::new(),
            failing_images: HashMap::new(),
        }
    }

    /// Return `output` for commands containing `pattern`
    pub fn on_command(mut self, pattern: &str, output: ExecOutput) -> Self {
        self.scripts.push((pattern.to_string(), Scripted::Output(output)));
        self
    }

    /// Fail commands containing `pattern` with `error`
    pub fn fail_command(mut self, pattern: &str, error: SandboxError) -> Self {
        self.scripts.push((pattern.to_string(), Scripted::Error(error)));
        self
    }

    /// Make commands containing `pattern` take `delay`. Delays beyond the
    /// run timeout surface as `SandboxError::Timeout`.
    pub fn delay_command(mut self, pattern: &str, delay: Duration) -> Self {
        self.scripts.push((
            pattern.to_string(),
            Scripted::Delayed(delay, ExecOutput::success("{}")),
        ));
        self
    }

    /// Refuse to acquire sandboxes from `image`
    pub fn fail_acquire(mut self, image: &str, message: &str) -> Self {
        self.failing_images
            .insert(image.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SandboxCall::Run { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|command| command.contains(pattern))
    }

    pub fn acquired_images(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SandboxCall::Acquire { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn written_files(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SandboxCall::WriteFile { path, content, .. } => Some((path, content)),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SandboxCall::Release { .. }))
            .count()
    }

    /// Sandboxes acquired and not yet released
    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    fn script_for(&self, command: &str) -> Option<Scripted> {
        self.scripts
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, scripted)| scripted.clone())
    }

    fn record(&self, call: SandboxCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Default for MockSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxPort for MockSandbox {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn acquire(
        &self,
        image: &str,
        hints: &ResourceHints,
    ) -> Result<SandboxHandle, SandboxError> {
        self.record(SandboxCall::Acquire {
            image: image.to_string(),
            name_prefix: hints.name_prefix.clone(),
        });

        if let Some(message) = self.failing_images.get(image) {
            return Err(SandboxError::AcquireFailed {
                image: image.to_string(),
                message: message.clone(),
            });
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("mock-sbx-{}", state.next_id);
        state.active.insert(id.clone());
        Ok(SandboxHandle::new(id, image))
    }

    async fn run(
        &self,
        handle: &SandboxHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        self.record(SandboxCall::Run {
            sandbox: handle.id().to_string(),
            command: command.to_string(),
        });

        match self.script_for(command) {
            None => Ok(ExecOutput::success("{}")),
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Error(error)) => Err(error),
            Some(Scripted::Delayed(delay, output)) => {
                if delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(SandboxError::Timeout {
                        command: command.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                tokio::time::sleep(delay).await;
                Ok(output)
            }
        }
    }

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        content: &str,
    ) -> Result<(), SandboxError> {
        self.record(SandboxCall::WriteFile {
            sandbox: handle.id().to_string(),
            path: path.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.record(SandboxCall::Release {
            sandbox: handle.id().to_string(),
        });
        self.state.lock().unwrap().active.remove(handle.id());
        Ok(())
    }
}

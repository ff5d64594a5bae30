//! # Scoped Sandbox Acquisition
//!
//! A [`SandboxLease`] owns one acquired sandbox. Callers release it explicitly
//! with [`SandboxLease::release`]; if the lease is dropped first (early return,
//! panic unwinding, or the owning workflow future being abandoned) the release
//! is spawned onto the current tokio runtime instead.

use super::port::{ExecOutput, ResourceHints, SandboxHandle, SandboxPort};
use crate::error::SandboxError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SandboxLease {
    port: Arc<dyn SandboxPort>,
    handle: SandboxHandle,
    released: bool,
}

impl SandboxLease {
    pub async fn acquire(
        port: Arc<dyn SandboxPort>,
        image: &str,
        hints: &ResourceHints,
    ) -> Result<Self, SandboxError> {
        let handle = port.acquire(image, hints).await?;
        debug!(
            provider = port.provider_name(),
            sandbox = %handle,
            "Sandbox acquired"
        );

        Ok(Self {
            port,
            handle,
            released: false,
        })
    }

    pub fn handle(&self) -> &SandboxHandle {
        &self.handle
    }

    pub async fn run(&self, command: &str, timeout: Duration) -> Result<ExecOutput, SandboxError> {
        self.port.run(&self.handle, command, timeout).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        self.port.write_file(&self.handle, path, content).await
    }

    pub async fn release(mut self) -> Result<(), SandboxError> {
        self.released = true;
        let result = self.port.release(&self.handle).await;
        debug!(sandbox = %self.handle, ok = result.is_ok(), "Sandbox released");
        result
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let port = Arc::clone(&self.port);
        let handle = self.handle.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(
                    sandbox = %handle,
                    "Sandbox lease dropped before release, releasing in background"
                );
                runtime.spawn(async move {
                    if let Err(err) = port.release(&handle).await {
                        warn!(sandbox = %handle, error = %err, "Background sandbox release failed");
                    }
                });
            }
            Err(_) => {
                warn!(
                    sandbox = %handle,
                    "Sandbox lease dropped outside a runtime, sandbox not released"
                );
            }
        }
    }
}

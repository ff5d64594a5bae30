//! Acquisition accounting wrapped around any [`SandboxPort`].

use super::port::{ExecOutput, ResourceHints, SandboxHandle, SandboxPort};
use crate::error::SandboxError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Decorator counting acquisitions per image and currently held sandboxes
pub struct TrackedSandboxPort {
    inner: Arc<dyn SandboxPort>,
    images_used: DashMap<String, u64>,
    active: AtomicUsize,
    failed_acquisitions: AtomicU64,
}

impl TrackedSandboxPort {
    pub fn new(inner: Arc<dyn SandboxPort>) -> Self {
        Self {
            inner,
            images_used: DashMap::new(),
            active: AtomicUsize::new(0),
            failed_acquisitions: AtomicU64::new(0),
        }
    }

    /// Successful acquisitions keyed by image
    pub fn images_used(&self) -> BTreeMap<String, u64> {
        self.images_used
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn active_sandboxes(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn failed_acquisitions(&self) -> u64 {
        self.failed_acquisitions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SandboxPort for TrackedSandboxPort {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn acquire(
        &self,
        image: &str,
        hints: &ResourceHints,
    ) -> Result<SandboxHandle, SandboxError> {
        match self.inner.acquire(image, hints).await {
            Ok(handle) => {
                *self.images_used.entry(image.to_string()).or_insert(0) += 1;
                self.active.fetch_add(1, Ordering::AcqRel);
                Ok(handle)
            }
            Err(err) => {
                self.failed_acquisitions.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        handle: &SandboxHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        self.inner.run(handle, command, timeout).await
    }

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        content: &str,
    ) -> Result<(), SandboxError> {
        self.inner.write_file(handle, path, content).await
    }

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let result = self.inner.release(handle).await;
        if result.is_ok() {
            let _ = self
                .active
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
        result
    }
}

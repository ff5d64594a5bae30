//! # Analysis Result Cache
//!
//! Successful tool payloads keyed by a SHA-256 digest of the tool name, the
//! rendered command and the analysed content. Failures are never stored.
//! The cache holds at most `capacity` payloads; the oldest insertion is
//! evicted first.

use crate::constants::defaults;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug)]
pub struct ResultCache {
    enabled: bool,
    capacity: usize,
    entries: DashMap<String, Value>,
    /// Insertion order of live keys, oldest first
    order: Mutex<VecDeque<String>>,
}

impl ResultCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            capacity: defaults::CACHE_CAPACITY,
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Bound the number of stored payloads. Zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cache that never stores or returns anything
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn key(tool: &str, command: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tool.as_bytes());
        hasher.update([0]);
        hasher.update(command.as_bytes());
        hasher.update([0]);
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Stored payload for `key`, marked `cached: true`
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        self.entries.get(key).map(|entry| {
            let mut payload = entry.value().clone();
            if let Value::Object(fields) = &mut payload {
                fields.insert("cached".to_string(), Value::Bool(true));
            }
            payload
        })
    }

    pub fn insert(&self, key: String, payload: Value) {
        if !self.enabled {
            return;
        }

        let mut order = self.order.lock();
        if self.entries.insert(key.clone(), payload).is_none() {
            order.push_back(key);
        }
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                debug!(key = %oldest, capacity = self.capacity, "Evicted cached result");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(true)
    }
}

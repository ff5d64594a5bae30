//! # Workflow History Store
//!
//! Bounded, append-only window of finalized workflow records. Lifetime
//! counters are running totals kept beside the window, so evicting old
//! records never changes the reported totals.

use crate::constants::{defaults, WorkflowStatus};
use crate::orchestration::types::{WorkflowRecord, WorkflowType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Running totals since the store was created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCounters {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub by_type: BTreeMap<WorkflowType, u64>,
}

impl LifetimeCounters {
    fn count(&mut self, record: &WorkflowRecord) {
        self.total += 1;
        match record.status {
            WorkflowStatus::Success => self.successful += 1,
            WorkflowStatus::Failed => self.failed += 1,
            WorkflowStatus::Running => {}
        }
        *self.by_type.entry(record.workflow_type).or_insert(0) += 1;
    }
}

/// Snapshot returned by [`HistoryStore::summary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub lifetime_total: u64,
    pub lifetime_successful: u64,
    pub lifetime_failed: u64,
    pub by_type: BTreeMap<WorkflowType, u64>,
    /// Retained records, oldest first
    pub recent: Vec<WorkflowRecord>,
}

#[derive(Debug, Default)]
struct HistoryState {
    window: VecDeque<WorkflowRecord>,
    counters: LifetimeCounters,
}

#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    state: Mutex<HistoryState>,
}

impl HistoryStore {
    /// Store retaining the `capacity` most recent records. Capacities below
    /// the minimum are raised to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(defaults::MIN_HISTORY_CAPACITY);
        Self {
            capacity,
            state: Mutex::new(HistoryState {
                window: VecDeque::with_capacity(capacity),
                counters: LifetimeCounters::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest retained one when full
    pub fn record(&self, record: WorkflowRecord) {
        let mut state = self.state.lock();
        state.counters.count(&record);

        if state.window.len() == self.capacity {
            if let Some(evicted) = state.window.pop_front() {
                debug!(
                    workflow_id = %evicted.workflow_id,
                    "Evicted workflow record from history window"
                );
            }
        }
        state.window.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.state.lock().window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().window.is_empty()
    }

    pub fn counters(&self) -> LifetimeCounters {
        self.state.lock().counters.clone()
    }

    /// Up to `limit` most recent records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<WorkflowRecord> {
        let state = self.state.lock();
        let skip = state.window.len().saturating_sub(limit);
        state.window.iter().skip(skip).cloned().collect()
    }

    pub fn summary(&self) -> HistorySummary {
        self.summary_with_limit(self.capacity)
    }

    pub fn summary_with_limit(&self, limit: usize) -> HistorySummary {
        let state = self.state.lock();
        let skip = state.window.len().saturating_sub(limit);

        HistorySummary {
            lifetime_total: state.counters.total,
            lifetime_successful: state.counters.successful,
            lifetime_failed: state.counters.failed,
            by_type: state.counters.by_type.clone(),
            recent: state.window.iter().skip(skip).cloned().collect(),
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(defaults::HISTORY_CAPACITY)
    }
}

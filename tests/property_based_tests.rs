mod common;
mod mocks;

use autopilot_core::orchestration::{standard_layout, step_fn, WorkflowRecord};
use autopilot_core::routing::{CostTable, RoutingTable};
use autopilot_core::{
    CostLedger, HistoryStore, StepContext, TaskRouter, WorkflowDefinition, WorkflowSequencer,
    WorkflowType,
};
use common::strategies::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn finished_records(workflow_type: WorkflowType, count: usize) -> Vec<WorkflowRecord> {
    let definition = WorkflowDefinition::new(workflow_type, Vec::new());
    let sequencer = WorkflowSequencer::new(Arc::new(HistoryStore::default()));

    (0..count)
        .map(|_| tokio_test::block_on(sequencer.run(&definition, &Default::default())))
        .collect()
}

proptest! {
    /// Property: routing is total for any partial table
    #[test]
    fn routing_is_total(
        entries in route_entries_strategy(),
        category in category_strategy(),
        tier in tier_strategy(),
    ) {
        let table = RoutingTable::from_entries("fallback-backend", entries.clone());
        let router = TaskRouter::new(table, CostTable::default(), Arc::new(CostLedger::new()));

        let decision = router.route(category, tier);
        let declared = entries
            .iter()
            .rev()
            .find(|entry| entry.category == category && entry.tier == tier);

        match declared {
            Some(entry) => {
                prop_assert!(!decision.fallback);
                prop_assert_eq!(&decision.backend, &entry.backend);
            }
            None => {
                prop_assert!(decision.fallback);
                prop_assert_eq!(decision.backend.as_str(), "fallback-backend");
            }
        }
    }

    /// Property: cost estimates are non-negative and linear in tokens
    #[test]
    fn estimates_are_linear_in_tokens(
        backend in backend_strategy(),
        unit_cost in unit_cost_strategy(),
        tokens in token_count_strategy(),
    ) {
        let costs = CostTable::new(0.001).with_unit_cost(backend.clone(), unit_cost);
        let router = TaskRouter::new(RoutingTable::default(), costs, Arc::new(CostLedger::new()));

        let single = router.estimate_cost(&backend, tokens);
        let double = router.estimate_cost(&backend, tokens * 2);

        prop_assert!(single >= 0.0);
        prop_assert!((double - 2.0 * single).abs() <= 1e-9);
        prop_assert!((single - tokens as f64 / 1000.0 * unit_cost).abs() <= 1e-12);
    }

    /// Property: every tracked request is counted exactly once
    #[test]
    fn ledger_counts_every_tracked_request(
        usage in prop::collection::vec((backend_strategy(), token_count_strategy()), 0..40),
    ) {
        let router = TaskRouter::with_defaults();
        let mut expected_cost = 0.0;

        for (backend, tokens) in &usage {
            expected_cost += router.track_usage(backend, *tokens);
        }

        let snapshot = router.ledger().snapshot();
        prop_assert_eq!(snapshot.request_count, usage.len() as u64);
        prop_assert!((snapshot.cumulative_cost - expected_cost).abs() <= 1e-9);

        let stats = router.usage_stats();
        prop_assert!(stats.avg_cost_per_request.is_finite());
        prop_assert!(stats.total_cost >= 0.0);
    }

    /// Property: the history window never exceeds capacity and lifetime
    /// counters never drop records
    #[test]
    fn history_window_is_bounded(
        capacity in 0usize..30,
        workflow_type in workflow_type_strategy(),
        count in 0usize..60,
    ) {
        let store = HistoryStore::new(capacity);
        let records = finished_records(workflow_type, count);

        for record in records.iter().cloned() {
            store.record(record);
        }

        let summary = store.summary();
        let capacity = store.capacity();
        prop_assert!(capacity >= 10);
        prop_assert_eq!(summary.lifetime_total, count as u64);
        prop_assert_eq!(summary.recent.len(), count.min(capacity));
        if let Some(last) = records.last() {
            prop_assert_eq!(&summary.recent[summary.recent.len() - 1], last);
        }
    }

    /// Property: only enabled steps are recorded, in declared order
    #[test]
    fn recorded_steps_follow_declared_order(
        workflow_type in workflow_type_strategy(),
        params in workflow_params_strategy(),
    ) {
        let definition = WorkflowDefinition::standard(workflow_type, |name| {
            Some(step_fn(name, |ctx: StepContext| async move {
                Ok(json!({ "step": ctx.step_name }))
            }))
        })
        .unwrap();
        let expected: Vec<&str> = standard_layout(workflow_type)
            .iter()
            .filter(|layout| match layout.flag {
                Some((flag, default)) => params.flag(flag).unwrap_or(default),
                None => true,
            })
            .map(|layout| layout.name)
            .collect();

        let sequencer = WorkflowSequencer::new(Arc::new(HistoryStore::default()));
        let record = tokio_test::block_on(sequencer.run(&definition, &params));

        prop_assert!(record.is_success());
        prop_assert_eq!(record.step_names(), expected);
    }
}

use autopilot_core::orchestration::WorkflowParams;
use autopilot_core::routing::RouteEntry;
use autopilot_core::{BackendId, ComplexityTier, TaskCategory, WorkflowType};
use proptest::prelude::*;
use proptest::strategy::Just;

/// Strategy for generating task categories
pub fn category_strategy() -> impl Strategy<Value = TaskCategory> {
    prop::sample::select(TaskCategory::ALL.to_vec())
}

/// Strategy for generating complexity tiers
pub fn tier_strategy() -> impl Strategy<Value = ComplexityTier> {
    prop::sample::select(ComplexityTier::ALL.to_vec())
}

pub fn workflow_type_strategy() -> impl Strategy<Value = WorkflowType> {
    prop::sample::select(WorkflowType::ALL.to_vec())
}

/// Strategy for generating backend names
pub fn backend_strategy() -> impl Strategy<Value = BackendId> {
    prop_oneof![
        Just(BackendId::new("gpt-4o-mini")),
        Just(BackendId::new("gpt-4o")),
        Just(BackendId::new("claude-3-5-sonnet")),
        Just(BackendId::new("claude-3-5-haiku")),
        "[a-z][a-z0-9-]{2,20}".prop_map(BackendId::new),
    ]
}

/// Strategy for generating partial routing tables
pub fn route_entries_strategy() -> impl Strategy<Value = Vec<RouteEntry>> {
    prop::collection::vec(
        (category_strategy(), tier_strategy(), backend_strategy()).prop_map(
            |(category, tier, backend)| RouteEntry {
                category,
                tier,
                backend,
            },
        ),
        0..15,
    )
}

/// Strategy for generating token estimates
pub fn token_count_strategy() -> impl Strategy<Value = u64> {
    0u64..=200_000
}

/// Strategy for generating unit costs, including zero
pub fn unit_cost_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.00001f64..0.1]
}

/// Strategy for generating invocation flags of the standard workflows
pub fn workflow_params_strategy() -> impl Strategy<Value = WorkflowParams> {
    (
        "[a-z ]{1,40}",
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(content, security, drift, scan, policies)| {
            let mut params = WorkflowParams::new(format!("x{content}"));
            for (flag, value) in [
                ("enable_security_scan", security),
                ("enable_drift_detection", drift),
                ("scan_image", scan),
                ("check_policies", policies),
            ] {
                if let Some(value) = value {
                    params = params.with_flag(flag, value);
                }
            }
            params
        })
}

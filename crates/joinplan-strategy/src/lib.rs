//! # joinplan-strategy: Global Strategies and Registries
//!
//! This crate provides the concrete planning strategies for the stream-join
//! planner and the registration tables that resolve strategy names (plus
//! free-form parameters) to instances.
//!
//! ## Tree strategies (plan via a materialization tree)
//!
//! - **`Flat`**: minimal materialization -- one store per base relation under
//!   a single non-materialized merge.
//! - **`LeftDeepGreedy`**: greedy join order, then a left-deep tree whose
//!   intermediate results are materialized while the resource budget lasts.
//! - **`TopDown`**: starts from a flat tree over a linear join graph and
//!   repeatedly materializes the cheapest contiguous sub-range.
//! - **`BottomUp`**: declared level-wise dynamic-programming strategy;
//!   surfaces `UnimplementedStrategy` until it is finished.
//!
//! ## Direct strategies (build their graph without a tree)
//!
//! - **`BinaryTheta`**: classic symmetric two-store join for exactly two
//!   relations.
//! - **`Similarity`**: two symmetric similarity stores for exactly two
//!   relations.
//! - **`SingleInputAggregation`**: declared single-relation
//!   filter/project/aggregate pipeline; the aggregation-store wiring is not
//!   specified, so it surfaces `UnimplementedStrategy`.
//!
//! ## Probe-order strategies
//!
//! `Exhaustive` and `Greedy`, implemented in `joinplan_core::probe_order`
//! and resolved here.

pub mod binary_theta;
pub mod bottom_up;
pub mod flat;
pub mod left_deep_greedy;
pub mod similarity;
pub mod single_aggregation;
pub mod top_down;

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{
    GlobalStrategy, OptimizationParameters, OptimizationResult, StrategySelection,
};
use joinplan_core::probe_order::{
    ExhaustiveProbeOrder, GreedyProbeOrder, ProbeOrderStrategy,
};
use joinplan_core::query::Query;

/// Names accepted by [`global_strategy`].
pub const SUPPORTED_GLOBAL_STRATEGIES: &[&str] = &[
    "BinaryTheta",
    "BottomUp",
    "Flat",
    "LeftDeepGreedy",
    "Similarity",
    "SingleInputAggregation",
    "TopDown",
];

pub const DEFAULT_GLOBAL_STRATEGY: &str = "Flat";

/// Names accepted by [`probe_order_strategy`].
pub const SUPPORTED_PROBE_ORDER_STRATEGIES: &[&str] = &["Exhaustive", "Greedy"];

pub const DEFAULT_PROBE_ORDER_STRATEGY: &str = "Greedy";

/// Resolve a global strategy by name. Unknown names fail listing the
/// supported set.
pub fn global_strategy(
    selection: &StrategySelection,
) -> Result<Box<dyn GlobalStrategy>, PlanError> {
    match selection.name.as_str() {
        "BinaryTheta" => Ok(Box::new(binary_theta::BinaryTheta)),
        "BottomUp" => Ok(Box::new(bottom_up::BottomUp)),
        "Flat" => Ok(Box::new(flat::Flat)),
        "LeftDeepGreedy" => Ok(Box::new(left_deep_greedy::LeftDeepGreedy)),
        "Similarity" => Ok(Box::new(similarity::Similarity)),
        "SingleInputAggregation" => {
            Ok(Box::new(single_aggregation::SingleInputAggregation))
        }
        "TopDown" => Ok(Box::new(top_down::TopDown)),
        other => Err(PlanError::Configuration(format!(
            "unknown global strategy '{}'; supported: {}",
            other,
            SUPPORTED_GLOBAL_STRATEGIES.join(", ")
        ))),
    }
}

/// Resolve a probe-order strategy by name, parsing its typed configuration
/// out of the free-form parameter map.
pub fn probe_order_strategy(
    selection: &StrategySelection,
) -> Result<Box<dyn ProbeOrderStrategy>, PlanError> {
    match selection.name.as_str() {
        "Exhaustive" => Ok(Box::new(ExhaustiveProbeOrder::from_params(&selection.params)?)),
        "Greedy" => Ok(Box::new(GreedyProbeOrder::from_params(&selection.params)?)),
        other => Err(PlanError::Configuration(format!(
            "unknown probe-order strategy '{}'; supported: {}",
            other,
            SUPPORTED_PROBE_ORDER_STRATEGIES.join(", ")
        ))),
    }
}

/// Run one optimization: resolve both strategies from the parameters and let
/// the global strategy drive.
pub fn optimize(
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
) -> Result<OptimizationResult, PlanError> {
    let global = global_strategy(&params.global_strategy)?;
    let probe_order = probe_order_strategy(&params.probe_order_strategy)?;
    global.optimize(query, characteristics, params, probe_order.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_contained_in_the_supported_sets() {
        assert!(SUPPORTED_GLOBAL_STRATEGIES.contains(&DEFAULT_GLOBAL_STRATEGY));
        assert!(SUPPORTED_PROBE_ORDER_STRATEGIES.contains(&DEFAULT_PROBE_ORDER_STRATEGY));
    }

    #[test]
    fn every_supported_global_strategy_resolves() {
        for name in SUPPORTED_GLOBAL_STRATEGIES {
            assert!(global_strategy(&StrategySelection::named(*name)).is_ok());
        }
    }

    #[test]
    fn unknown_names_report_the_supported_set() {
        let err = global_strategy(&StrategySelection::named("Nope")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Nope"));
        assert!(message.contains("Flat"));
        assert!(message.contains("LeftDeepGreedy"));

        let err = probe_order_strategy(&StrategySelection::named("Nope")).unwrap_err();
        assert!(err.to_string().contains("Greedy"));
    }
}

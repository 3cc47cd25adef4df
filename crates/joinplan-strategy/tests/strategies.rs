//! End-to-end optimization tests through the strategy registries: resolve by
//! name, run, and check the produced graph and cost estimate.

use joinplan_core::characteristics::ManualCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{OptimizationParameters, StrategySelection};
use joinplan_core::query::{
    relation_of, BinaryPredicate, Query, Relation, RelationAlias,
};
use joinplan_strategy::optimize;
use std::collections::BTreeMap;

/// A linear chain query r(1) -- r(2) -- … -- r(n) with uniform rates and the
/// given per-edge selectivity.
fn chain_query(names: &[&str]) -> Query {
    let mut inputs = BTreeMap::new();
    for name in names {
        inputs.extend(relation_of(name).inputs);
    }
    let join_predicates = names
        .windows(2)
        .map(|pair| {
            BinaryPredicate::equality(
                &format!("{}.k", pair[0]),
                &format!("{}.k", pair[1]),
            )
        })
        .collect();
    Query::from_relation(Relation {
        inputs,
        filters: Vec::new(),
        join_predicates,
        aggregations: Vec::new(),
        projections: Vec::new(),
        alias: RelationAlias::new(names.join("")),
    })
}

fn chain_characteristics(names: &[&str], rate: f64, selectivity: f64) -> ManualCharacteristics {
    let mut dc = ManualCharacteristics::new();
    for name in names {
        dc.set_rate(*name, rate);
    }
    for pair in names.windows(2) {
        dc.set_selectivity(pair[0], pair[1], selectivity);
    }
    dc
}

#[test]
fn flat_plans_the_chain_with_expected_costs() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names, 100.0, 0.01);
    let params = OptimizationParameters::default();

    let result = optimize(&query, &dc, &params).unwrap();

    // Storage: three base stores of 100 tuples each. Probe: each of the
    // three roots costs |⋈ of two| + |⋈ of three| = 100 + 100.
    assert!((result.cost_estimation.storage_cost - 300.0).abs() < 1e-9);
    assert!((result.cost_estimation.probe_cost - 600.0).abs() < 1e-9);
    assert_eq!(result.cost_estimation.num_tasks, 3);

    let tree = result.tree.expect("tree strategies keep their tree");
    assert_eq!(tree.parenthesized(), "(r,s,t)");

    let graph = result.physical_graph;
    assert_eq!(graph.input_stubs().len(), 3);
    assert!(graph.output_stub().is_some());
    assert_eq!(graph.relation_stores().len(), 3);
}

#[test]
fn over_budget_plans_are_rejected_not_clamped() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names, 100.0, 0.01);

    // The flat plan needs one task per base store, three in total.
    let params = OptimizationParameters {
        available_tasks: 2,
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params);
    assert!(matches!(result, Err(PlanError::ResourceBudget(_))));
}

#[test]
fn parallelism_follows_the_task_capacity() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names, 100.0, 0.01);

    // 100 tuples per store at 40 per task → 3 instances each.
    let params = OptimizationParameters {
        task_capacity: 40,
        available_tasks: 9,
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    assert_eq!(result.cost_estimation.num_tasks, 9);

    let short = OptimizationParameters {
        task_capacity: 40,
        available_tasks: 8,
        ..OptimizationParameters::default()
    };
    assert!(matches!(
        optimize(&query, &dc, &short),
        Err(PlanError::ResourceBudget(_))
    ));
}

#[test]
fn missing_rate_surfaces_from_the_probe_order_search() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    // No rate for t.
    let mut dc = ManualCharacteristics::new();
    dc.set_rate("r", 100.0);
    dc.set_rate("s", 100.0);
    dc.set_selectivity("r", "s", 0.01);
    dc.set_selectivity("s", "t", 0.01);

    let params = OptimizationParameters::default();
    let result = optimize(&query, &dc, &params);
    assert!(matches!(result, Err(PlanError::MissingStatistic(_))));
}

#[test]
fn unknown_strategy_names_fail_with_the_supported_set() {
    let names = ["r", "s"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names, 100.0, 0.01);

    let params = OptimizationParameters {
        global_strategy: StrategySelection::named("Cascades"),
        ..OptimizationParameters::default()
    };
    let err = optimize(&query, &dc, &params).unwrap_err();
    assert!(matches!(err, PlanError::Configuration(_)));
    assert!(err.to_string().contains("LeftDeepGreedy"));

    let params = OptimizationParameters {
        probe_order_strategy: StrategySelection::named("Random"),
        ..OptimizationParameters::default()
    };
    let err = optimize(&query, &dc, &params).unwrap_err();
    assert!(err.to_string().contains("Exhaustive"));
}

#[test]
fn exhaustive_probe_orders_can_be_selected_with_params() {
    let names = ["r", "s", "t", "u"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names, 100.0, 0.01);

    let mut selection = StrategySelection::named("Exhaustive");
    selection
        .params
        .insert("maxRelations".to_string(), serde_json::json!(6));
    let params = OptimizationParameters {
        probe_order_strategy: selection,
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    assert_eq!(result.cost_estimation.num_tasks, 4);

    // A guard below the relation count rejects the query.
    let mut tight = StrategySelection::named("Exhaustive");
    tight
        .params
        .insert("maxRelations".to_string(), serde_json::json!(3));
    let params = OptimizationParameters {
        probe_order_strategy: tight,
        ..OptimizationParameters::default()
    };
    assert!(matches!(
        optimize(&query, &dc, &params),
        Err(PlanError::Configuration(_))
    ));
}

#[test]
fn disconnected_queries_need_cross_products_enabled() {
    // Two disconnected components: a--b and c--d.
    let mut inputs = BTreeMap::new();
    for name in ["a", "b", "c", "d"] {
        inputs.extend(relation_of(name).inputs);
    }
    let query = Query::from_relation(Relation {
        inputs,
        filters: Vec::new(),
        join_predicates: vec![
            BinaryPredicate::equality("a.k", "b.k"),
            BinaryPredicate::equality("c.k", "d.k"),
        ],
        aggregations: Vec::new(),
        projections: Vec::new(),
        alias: RelationAlias::new("abcd"),
    });
    let mut dc = ManualCharacteristics::new();
    for name in ["a", "b", "c", "d"] {
        dc.set_rate(name, 10.0);
    }
    dc.set_selectivity("a", "b", 0.1);
    dc.set_selectivity("c", "d", 0.1);

    let params = OptimizationParameters::default();
    assert!(matches!(
        optimize(&query, &dc, &params),
        Err(PlanError::Configuration(_))
    ));

    let params = OptimizationParameters {
        cross_products_allowed: true,
        ..OptimizationParameters::default()
    };
    assert!(optimize(&query, &dc, &params).is_ok());
}

//! Shape and budget behavior of the tree-building strategies.

use joinplan_core::characteristics::ManualCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{OptimizationParameters, StrategySelection};
use joinplan_core::query::{
    relation_of, BinaryPredicate, Query, Relation, RelationAlias,
};
use joinplan_core::tree::MtNode;
use joinplan_strategy::optimize;
use std::collections::BTreeMap;

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

fn left_deep_params() -> OptimizationParameters {
    OptimizationParameters {
        global_strategy: StrategySelection::named("LeftDeepGreedy"),
        ..OptimizationParameters::default()
    }
}

/// Chain a--b--c--d whose a⋈b end is by far the most selective, so the greedy
/// order starts there.
fn skewed_chain_characteristics() -> ManualCharacteristics {
    let mut dc = ManualCharacteristics::new();
    for name in ["a", "b", "c", "d"] {
        dc.set_rate(name, 100.0);
    }
    dc.set_selectivity("a", "b", 0.001);
    dc.set_selectivity("b", "c", 0.01);
    dc.set_selectivity("c", "d", 0.1);
    dc
}

#[test]
fn left_deep_materializes_while_the_budget_lasts() {
    let query = chain_query(&["a", "b", "c", "d"]);
    let dc = skewed_chain_characteristics();

    let params = OptimizationParameters {
        task_capacity: 1_000_000,
        available_tasks: 100,
        ..left_deep_params()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.expect("tree strategy keeps its tree");
    // Enough budget to materialize a⋈b and a⋈b⋈c.
    assert_eq!(tree.parenthesized(), "(((a,b),c),d)");
}

#[test]
fn left_deep_stops_materializing_when_tasks_run_out() {
    let query = chain_query(&["a", "b", "c", "d"]);
    let dc = skewed_chain_characteristics();

    // Four base stores plus one intermediate store exhaust the five tasks,
    // so only a⋈b is materialized.
    let params = OptimizationParameters {
        task_capacity: 1_000_000,
        available_tasks: 5,
        ..left_deep_params()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.unwrap();
    assert_eq!(tree.parenthesized(), "((a,b),c,d)");
    assert_eq!(result.cost_estimation.num_tasks, 5);
}

#[test]
fn left_deep_rejects_disconnected_queries() {
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

    assert!(matches!(
        optimize(&query, &dc, &left_deep_params()),
        Err(PlanError::Configuration(_))
    ));

    let params = OptimizationParameters {
        cross_products_allowed: true,
        ..left_deep_params()
    };
    assert!(optimize(&query, &dc, &params).is_ok());
}

#[test]
fn left_deep_derives_partitioning_for_inner_stores() {
    let query = chain_query(&["a", "b", "c", "d"]);
    let dc = skewed_chain_characteristics();
    let params = OptimizationParameters {
        task_capacity: 1_000_000,
        available_tasks: 5,
        ..left_deep_params()
    };

    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.unwrap();

    // The a⋈b store is joined onward via b.k = c.k, so it is partitioned by
    // its side of that predicate.
    let inner = tree
        .walk()
        .into_iter()
        .find_map(|node| match node {
            MtNode::MatMultiStream(m) => Some(m),
            _ => None,
        })
        .expect("one materialized multi-stream");
    assert_eq!(inner.relation.name(), "ab");
    assert_eq!(inner.partitioning.len(), 1);
    assert_eq!(inner.partitioning[0].to_string(), "b.k");
}

#[test]
fn top_down_merges_the_cheapest_range() {
    let query = chain_query(&["r", "s", "t"]);
    let mut dc = ManualCharacteristics::new();
    for name in ["r", "s", "t"] {
        dc.set_rate(name, 100.0);
    }
    dc.set_selectivity("r", "s", 0.01);
    dc.set_selectivity("s", "t", 0.01);

    let params = OptimizationParameters {
        global_strategy: StrategySelection::named("TopDown"),
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.unwrap();
    assert_eq!(tree.parenthesized(), "((r,s),t)");
    // Three base stores of 100 plus the 100-tuple r⋈s store.
    assert!((result.cost_estimation.storage_cost - 400.0).abs() < 1e-9);
    assert_eq!(result.cost_estimation.num_tasks, 4);
}

#[test]
fn top_down_respects_the_task_budget() {
    let query = chain_query(&["r", "s", "t"]);
    let mut dc = ManualCharacteristics::new();
    for name in ["r", "s", "t"] {
        dc.set_rate(name, 100.0);
    }
    dc.set_selectivity("r", "s", 0.01);
    dc.set_selectivity("s", "t", 0.01);

    // Exactly the three base stores fit; no range is materialized.
    let params = OptimizationParameters {
        global_strategy: StrategySelection::named("TopDown"),
        available_tasks: 3,
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.unwrap();
    assert_eq!(tree.parenthesized(), "(r,s,t)");
    assert_eq!(result.cost_estimation.num_tasks, 3);
}

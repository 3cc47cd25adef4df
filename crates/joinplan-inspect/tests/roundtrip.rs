//! Export round-trips: the structural part of an exported tree must re-read
//! to exactly the shape of the tree it came from, for flat and left-deep
//! plans alike.

use joinplan_core::characteristics::ManualCharacteristics;
use joinplan_core::optimize::{OptimizationParameters, StrategySelection};
use joinplan_core::query::{
    relation_of, BinaryPredicate, Query, Relation, RelationAlias,
};
use joinplan_inspect::dot::graph_to_dot;
use joinplan_inspect::graph_json::graph_to_json;
use joinplan_inspect::tree_json::{shape_from_json, shape_of, tree_to_json};
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

fn chain_characteristics(names: &[&str]) -> ManualCharacteristics {
    let mut dc = ManualCharacteristics::new();
    for name in names {
        dc.set_rate(*name, 100.0);
    }
    for pair in names.windows(2) {
        dc.set_selectivity(pair[0], pair[1], 0.01);
    }
    dc
}

#[test]
fn flat_tree_shape_round_trips() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names);
    let result = optimize(&query, &dc, &OptimizationParameters::default()).unwrap();
    let tree = result.tree.unwrap();

    let exported = tree_to_json(&tree);
    let reread = shape_from_json(&exported).unwrap();
    assert_eq!(reread, shape_of(&tree));
    assert_eq!(reread.node_type, "NonMatMultiStream");
    assert_eq!(reread.relation, "rst");
    assert_eq!(reread.children.len(), 3);
    assert!(reread.children.iter().all(|c| c.node_type == "MatSource"));
}

#[test]
fn left_deep_tree_shape_round_trips() {
    let names = ["a", "b", "c", "d"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names);
    let params = OptimizationParameters {
        global_strategy: StrategySelection::named("LeftDeepGreedy"),
        task_capacity: 1_000_000,
        available_tasks: 100,
        ..OptimizationParameters::default()
    };
    let result = optimize(&query, &dc, &params).unwrap();
    let tree = result.tree.unwrap();

    let exported = tree_to_json(&tree);
    let reread = shape_from_json(&exported).unwrap();
    assert_eq!(reread, shape_of(&tree));

    // The exported materialized nodes carry their cost fields.
    let root = exported.as_object().unwrap();
    assert!(root.contains_key("probeOrder"));
    assert!(root.contains_key("probeCost"));
    let first_child = &root["children"][0];
    assert_eq!(first_child["type"], "MatMultiStream");
    assert!(first_child.get("storageCost").is_some());
    assert!(first_child.get("parallelism").is_some());
}

#[test]
fn malformed_documents_are_rejected() {
    let missing_type = serde_json::json!({ "relation": "r" });
    assert!(shape_from_json(&missing_type).is_err());
    let bad_children = serde_json::json!({
        "type": "NonMatMultiStream",
        "relation": "r",
        "children": 3
    });
    assert!(shape_from_json(&bad_children).is_err());
}

#[test]
fn graph_exports_cover_every_node_and_edge() {
    let names = ["r", "s", "t"];
    let query = chain_query(&names);
    let dc = chain_characteristics(&names);
    let result = optimize(&query, &dc, &OptimizationParameters::default()).unwrap();

    let document = graph_to_json(&result.physical_graph);
    let nodes = document["nodes"].as_array().unwrap();
    let edges = document["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), result.physical_graph.nodes().count());
    assert_eq!(edges.len(), result.physical_graph.edges().len());
    assert!(nodes.iter().any(|n| n["nodetype"] == "Spout"));
    assert!(nodes.iter().any(|n| n["nodetype"] == "Store"));
    assert!(nodes.iter().any(|n| n["nodetype"] == "Sink"));

    let dot = graph_to_dot(&result.physical_graph);
    assert!(dot.starts_with("digraph plan {"));
    for edge in result.physical_graph.edges() {
        assert!(dot.contains(&format!("\"{}\"", edge.label)));
    }
}

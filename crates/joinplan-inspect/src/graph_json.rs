//! # Physical Graph Export
//!
//! A graph exports as one document with a node list and an edge list:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "label": "r-spout", "parallelism": 1, "nodetype": "Spout", "rules": [...] },
//!     { "label": "r-store", "parallelism": 5, "nodetype": "Store",
//!       "partitioning": "r.x", "rules": [...] }
//!   ],
//!   "edges": [
//!     { "from": "r-spout", "to": "r-store", "edgetype": "SHUFFLE" }
//!   ]
//! }
//! ```
//!
//! Stubs and stores can share a relation label, so the exported labels are
//! suffixed by role to stay unambiguous in renderings.

use joinplan_core::physical::{Node, NodeKind, PhysicalGraph};
use serde_json::{json, Value};

/// Display label disambiguated by node role.
pub fn display_label(node: &Node) -> String {
    match &node.kind {
        NodeKind::InputStub { .. } => format!("{}-spout", node.label),
        NodeKind::OutputStub { .. } => format!("{}-sink", node.label),
        NodeKind::ThetaStore { .. }
        | NodeKind::SimilarityStore { .. }
        | NodeKind::AggregationStore { .. } => format!("{}-store", node.label),
        NodeKind::SelectProjectNode { .. } => format!("{}-select", node.label),
    }
}

fn node_type(node: &Node) -> &'static str {
    match &node.kind {
        NodeKind::InputStub { .. } => "Spout",
        NodeKind::OutputStub { .. } => "Sink",
        NodeKind::ThetaStore { .. }
        | NodeKind::SimilarityStore { .. }
        | NodeKind::AggregationStore { .. } => "Store",
        NodeKind::SelectProjectNode { .. } => "SelectProject",
    }
}

/// Export a physical graph as a `{nodes, edges}` document.
pub fn graph_to_json(graph: &PhysicalGraph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes()
        .map(|(_, node)| {
            let mut object = json!({
                "label": display_label(node),
                "parallelism": node.parallelism,
                "nodetype": node_type(node),
                "rules": node.rules.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            });
            if let NodeKind::ThetaStore { partitioning, .. } = &node.kind {
                object["partitioning"] = Value::String(
                    partitioning
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
            object
        })
        .collect();

    let edges: Vec<Value> = graph
        .edges()
        .iter()
        .map(|edge| {
            json!({
                "from": display_label(graph.node(edge.from)),
                "to": display_label(graph.node(edge.to)),
                "edgetype": edge.kind.to_string(),
            })
        })
        .collect();

    json!({ "nodes": nodes, "edges": edges })
}

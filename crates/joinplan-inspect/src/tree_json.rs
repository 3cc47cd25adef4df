//! # Materialization Tree Export
//!
//! One JSON object per tree node. A non-materialized multi-stream exports as
//!
//! ```json
//! {
//!   "type": "NonMatMultiStream",
//!   "relation": "rst",
//!   "children": [ ... ],
//!   "probeOrder": [["r", "s", "t"], ["s", "r", "t"], ["t", "s", "r"]],
//!   "probeCost": 100.0
//! }
//! ```
//!
//! a materialized multi-stream additionally carries `parallelism`,
//! `partitioning`, and `storageCost`, and a source carries everything but
//! children and probe orders. The field names are stable -- inspection
//! tooling matches on them.

use crate::InspectError;
use joinplan_core::probe_order::ProbeOrders;
use joinplan_core::query::AttributeAccess;
use joinplan_core::tree::{MaterializationTree, MtNode};
use serde_json::{json, Value};

/// Export a tree as nested JSON objects.
pub fn tree_to_json(tree: &MaterializationTree) -> Value {
    node_to_json(&tree.root)
}

fn node_to_json(node: &MtNode) -> Value {
    match node {
        MtNode::MatSource(source) => json!({
            "type": "MatSource",
            "relation": source.relation.name(),
            "parallelism": source.parallelism,
            "partitioning": partitioning_to_json(&source.partitioning),
            "storageCost": source.storage_cost,
        }),
        MtNode::MatMultiStream(multi) => json!({
            "type": "MatMultiStream",
            "relation": multi.relation.name(),
            "children": multi.children.iter().map(node_to_json).collect::<Vec<_>>(),
            "probeOrder": probe_orders_to_json(&multi.probe_orders),
            "parallelism": multi.parallelism,
            "partitioning": partitioning_to_json(&multi.partitioning),
            "storageCost": multi.storage_cost,
            "probeCost": multi.probe_cost,
        }),
        MtNode::NonMatMultiStream(multi) => json!({
            "type": "NonMatMultiStream",
            "relation": multi.relation.name(),
            "children": multi.children.iter().map(node_to_json).collect::<Vec<_>>(),
            "probeOrder": probe_orders_to_json(&multi.probe_orders),
            "probeCost": multi.probe_cost,
        }),
    }
}

fn probe_orders_to_json(orders: &ProbeOrders) -> Value {
    Value::Array(
        orders
            .inner
            .values()
            .map(|(order, _)| {
                Value::Array(
                    order
                        .relation_names()
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                )
            })
            .collect(),
    )
}

fn partitioning_to_json(partitioning: &[AttributeAccess]) -> Value {
    Value::String(
        partitioning
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// The structural part of an exported tree: node type, relation identity,
/// and children. This is what round-trip checks compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    pub node_type: String,
    pub relation: String,
    pub children: Vec<TreeShape>,
}

/// Shape of an in-memory tree, for comparison against a re-read export.
pub fn shape_of(tree: &MaterializationTree) -> TreeShape {
    fn shape(node: &MtNode) -> TreeShape {
        TreeShape {
            node_type: match node {
                MtNode::MatSource(_) => "MatSource",
                MtNode::MatMultiStream(_) => "MatMultiStream",
                MtNode::NonMatMultiStream(_) => "NonMatMultiStream",
            }
            .to_string(),
            relation: node.relation().name(),
            children: node.children().iter().map(shape).collect(),
        }
    }
    shape(&tree.root)
}

/// Re-read the structural part of an exported tree document.
pub fn shape_from_json(value: &Value) -> Result<TreeShape, InspectError> {
    let object = value
        .as_object()
        .ok_or_else(|| InspectError::MalformedTree("node is not an object".to_string()))?;
    let node_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| InspectError::MalformedTree("node is missing 'type'".to_string()))?
        .to_string();
    let relation = object
        .get("relation")
        .and_then(Value::as_str)
        .ok_or_else(|| InspectError::MalformedTree("node is missing 'relation'".to_string()))?
        .to_string();
    let children = match object.get("children") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(shape_from_json)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(InspectError::MalformedTree(
                "'children' is not an array".to_string(),
            ))
        }
    };
    Ok(TreeShape { node_type, relation, children })
}

//! # Graphviz Rendering
//!
//! DOT output for eyeballing a physical graph: stores as boxes, stubs as
//! ellipses, edges styled by distribution type (`SHUFFLE` solid, `ALL`
//! dashed, `GROUP_BY` dotted) and labeled with their unique edge name.

use crate::graph_json::display_label;
use joinplan_core::physical::{EdgeKind, NodeKind, PhysicalGraph};
use std::fmt::Write;

/// Render a physical graph as a DOT digraph.
pub fn graph_to_dot(graph: &PhysicalGraph) -> String {
    let mut out = String::from("digraph plan {\n");

    for (id, node) in graph.nodes() {
        let shape = match &node.kind {
            NodeKind::InputStub { .. } | NodeKind::OutputStub { .. } => "ellipse",
            NodeKind::SelectProjectNode { .. } => "diamond",
            _ => "box",
        };
        let _ = writeln!(
            out,
            "  n{} [label=\"{}\\n×{}\", shape={}];",
            id,
            display_label(node),
            node.parallelism,
            shape
        );
    }

    for edge in graph.edges() {
        let style = match edge.kind {
            EdgeKind::Shuffle => "solid",
            EdgeKind::All => "dashed",
            EdgeKind::GroupBy => "dotted",
        };
        let _ = writeln!(
            out,
            "  n{} -> n{} [label=\"{}\", style={}];",
            edge.from, edge.to, edge.label, style
        );
    }

    out.push_str("}\n");
    out
}

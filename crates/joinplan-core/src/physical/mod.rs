//! # Physical Graph Model
//!
//! The planner's output form: an explicit operator graph of typed nodes
//! connected by labeled, typed edges, where each node carries declarative
//! rules describing how it reacts to tuples arriving on its edges. The graph
//! is consumed by an external runtime translator that replaces the input and
//! output stubs with concrete sources and sinks and deploys the rest.
//!
//! Nodes live in an arena owned by [`graph::PhysicalGraph`] and are addressed
//! by index, so edges and rules reference nodes without shared-ownership
//! cycles.

pub mod edges;
pub mod graph;
pub mod nodes;
pub mod rules;

pub use edges::{Edge, EdgeKind, EdgeLabel};
pub use graph::PhysicalGraph;
pub use nodes::{Node, NodeId, NodeKind};
pub use rules::{BinaryPredicateEvaluation, Rule};

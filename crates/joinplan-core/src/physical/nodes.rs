//! # Physical Graph Nodes
//!
//! Every operator the planner can emit, as one closed enum. Stubs are
//! placeholders the runtime translator later binds to concrete sources and
//! sinks; stores hold continuously updated join state; the select/project
//! node is a stateless filter stage.

use crate::query::{AttributeAccess, Relation};
use crate::physical::rules::Rule;

/// Index of a node in its graph's arena.
pub type NodeId = usize;

/// The operator kinds of the physical graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Placeholder source of tuples for one base relation.
    InputStub { relation: Relation },
    /// Placeholder sink receiving the final result relation.
    OutputStub { relation: Relation },
    /// Partitioned store evaluating arbitrary binary comparison predicates
    /// between arriving probe tuples and its stored tuples.
    ThetaStore {
        relation: Relation,
        partitioning: Vec<AttributeAccess>,
    },
    /// Store with a pluggable similarity predicate; same shape as a theta
    /// store, different evaluation machinery at runtime.
    SimilarityStore { relation: Relation },
    /// Groups and aggregates single-relation tuples by key.
    AggregationStore { relation: Relation },
    /// Stateless filter and projection stage.
    SelectProjectNode { relation: Relation },
}

impl NodeKind {
    pub fn relation(&self) -> &Relation {
        match self {
            NodeKind::InputStub { relation }
            | NodeKind::OutputStub { relation }
            | NodeKind::ThetaStore { relation, .. }
            | NodeKind::SimilarityStore { relation }
            | NodeKind::AggregationStore { relation }
            | NodeKind::SelectProjectNode { relation } => relation,
        }
    }

    /// Whether this node holds continuously updated state.
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            NodeKind::ThetaStore { .. }
                | NodeKind::SimilarityStore { .. }
                | NodeKind::AggregationStore { .. }
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::InputStub { .. } => "InputStub",
            NodeKind::OutputStub { .. } => "OutputStub",
            NodeKind::ThetaStore { .. } => "ThetaStore",
            NodeKind::SimilarityStore { .. } => "SimilarityStore",
            NodeKind::AggregationStore { .. } => "AggregationStore",
            NodeKind::SelectProjectNode { .. } => "SelectProjectNode",
        }
    }
}

/// One node of the physical graph: its kind, display label, parallelism, and
/// the rules describing its reactive behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub parallelism: i64,
    pub kind: NodeKind,
    pub rules: Vec<Rule>,
}

impl Node {
    pub fn new(label: impl Into<String>, parallelism: i64, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            parallelism,
            kind,
            rules: Vec::new(),
        }
    }
}

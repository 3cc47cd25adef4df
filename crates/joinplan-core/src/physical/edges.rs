//! # Physical Graph Edges
//!
//! Edges are labeled, directed, and typed by how they distribute tuples
//! across the target's parallel instances:
//!
//! - `SHUFFLE` routes by partition-key hash, so equal keys reach the same
//!   instance. Required in front of every store insert -- otherwise matching
//!   tuples could land on different instances and never join.
//! - `ALL` broadcasts to every instance. Used for probing a store from
//!   another relation's stream, which is generally not co-partitioned with
//!   the store.
//! - `GROUP_BY` routes by grouping key in front of aggregation.

use crate::physical::nodes::NodeId;
use crate::query::Attribute;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique name of an edge within one graph, of the form `s_<n>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeLabel(pub String);

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Distribution type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Shuffle,
    All,
    GroupBy,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Shuffle => write!(f, "SHUFFLE"),
            EdgeKind::All => write!(f, "ALL"),
            EdgeKind::GroupBy => write!(f, "GROUP_BY"),
        }
    }
}

/// A directed edge: exactly one source, one target, one unique label, and --
/// for `GROUP_BY` edges -- the attribute the stream is grouped by.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub label: EdgeLabel,
    pub kind: EdgeKind,
    pub from: NodeId,
    pub to: NodeId,
    pub group: Option<Attribute>,
}

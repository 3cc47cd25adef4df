//! # The Physical Graph
//!
//! Arena-style graph container. Nodes are owned by the graph and addressed
//! by [`NodeId`]; edges reference nodes by id and carry a label that is
//! unique within the graph (a per-graph counter, so separately built graphs
//! never share label spaces).
//!
//! This is the only place graph components are added -- strategies and the
//! tree builder manipulate the graph exclusively through these methods.
//! Store and producer bookkeeping is keyed by the canonical relation name:
//! `relation_stores` tracks which node materializes which relation, and
//! `relation_producers` tracks every node that emits complete tuples of a
//! relation (an input stub for its base relation, or the final store of a
//! probe chain for a joined relation).

use crate::error::PlanError;
use crate::physical::edges::{Edge, EdgeKind, EdgeLabel};
use crate::physical::nodes::{Node, NodeId, NodeKind};
use crate::physical::rules::Rule;
use crate::query::{Attribute, Relation, RelationName};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// The operator graph produced by optimization.
#[derive(Debug, Default)]
pub struct PhysicalGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    input_stubs: BTreeMap<RelationName, NodeId>,
    output_stub: Option<NodeId>,
    relation_stores: BTreeMap<RelationName, NodeId>,
    relation_producers: BTreeMap<RelationName, BTreeSet<NodeId>>,
    next_edge: u64,
}

impl PhysicalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -- nodes --------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Add an input stub for a base relation and register it as that
    /// relation's producer.
    pub fn add_input_stub_for(&mut self, relation: &Relation) -> NodeId {
        let id = self.add_node(Node::new(
            relation.name(),
            1,
            NodeKind::InputStub { relation: relation.clone() },
        ));
        self.input_stubs.insert(relation.name(), id);
        self.add_relation_producer(relation, id);
        id
    }

    pub fn input_stubs(&self) -> &BTreeMap<RelationName, NodeId> {
        &self.input_stubs
    }

    /// Add the output stub receiving the final result relation.
    pub fn add_output_stub_for(&mut self, relation: &Relation) -> NodeId {
        let id = self.add_node(Node::new(
            relation.name(),
            1,
            NodeKind::OutputStub { relation: relation.clone() },
        ));
        self.output_stub = Some(id);
        id
    }

    pub fn output_stub(&self) -> Option<NodeId> {
        self.output_stub
    }

    /// Add a store node and register it for its relation.
    pub fn add_store(&mut self, node: Node) -> NodeId {
        debug_assert!(node.kind.is_store(), "add_store expects a store node");
        let name = node.kind.relation().name();
        let id = self.add_node(node);
        self.relation_stores.insert(name, id);
        id
    }

    /// The store registered for a relation name.
    pub fn relation_store(&self, relation: &str) -> Result<NodeId, PlanError> {
        self.relation_stores.get(relation).copied().ok_or_else(|| {
            PlanError::Configuration(format!(
                "wanted to access a store for relation '{}' but no store is associated",
                relation
            ))
        })
    }

    pub fn relation_stores(&self) -> &BTreeMap<RelationName, NodeId> {
        &self.relation_stores
    }

    /// Register a node that emits complete tuples of the relation.
    pub fn add_relation_producer(&mut self, relation: &Relation, producer: NodeId) {
        self.relation_producers
            .entry(relation.name())
            .or_default()
            .insert(producer);
    }

    /// Nodes producing the relation, in insertion-independent order.
    pub fn producers_of(&self, relation: &str) -> Vec<NodeId> {
        self.relation_producers
            .get(relation)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // -- edges --------------------------------------------------------------

    /// Add an edge with a freshly generated unique label.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> EdgeLabel {
        let label = EdgeLabel(format!("s_{}", self.next_edge));
        self.next_edge += 1;
        self.edges.push(Edge { label: label.clone(), kind, from, to, group: None });
        label
    }

    /// Add a `GROUP_BY` edge grouped by the given attribute.
    pub fn add_grouped_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        group: Attribute,
    ) -> EdgeLabel {
        let label = EdgeLabel(format!("s_{}", self.next_edge));
        self.next_edge += 1;
        self.edges.push(Edge {
            label: label.clone(),
            kind: EdgeKind::GroupBy,
            from,
            to,
            group: Some(group),
        });
        label
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, label: &EdgeLabel) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.label == label)
    }

    // -- rules --------------------------------------------------------------

    /// Attach a rule to a node. The edges a rule names must already exist and
    /// be incident to the node -- wire the edge first, then add the rule.
    pub fn add_rule(&mut self, node: NodeId, rule: Rule) {
        trace!(node = %self.nodes[node].label, rule = %rule, "adding rule");
        debug_assert!(
            rule.incoming()
                .map_or(true, |l| self.edge_is_incident(l, node)),
            "rule references an incoming edge that does not arrive at the node"
        );
        debug_assert!(
            rule.outgoing()
                .map_or(true, |l| self.edge_is_incident(l, node)),
            "rule references an outgoing edge that does not leave the node"
        );
        self.nodes[node].rules.push(rule);
    }

    fn edge_is_incident(&self, label: &EdgeLabel, node: NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| &e.label == label && (e.from == node || e.to == node))
    }
}

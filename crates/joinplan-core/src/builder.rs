//! # Materialization Tree → Physical Graph
//!
//! Translates a materialization tree into the explicit operator graph. The
//! translation runs in four phases over the post-order node list, so every
//! phase can rely on the previous one having completed for the whole tree:
//!
//! 1. **Stubs** -- one input stub per `MatSource` base relation, one output
//!    stub for the root's result relation.
//! 2. **Stores** -- a partitioned theta store per materialized node; source
//!    stores are immediately fed from their input stubs over `SHUFFLE`
//!    edges (send rule at the stub, receive rule at the store).
//! 3. **Producer marking** -- the final store of each probe order produces
//!    the multi-stream's joined relation.
//! 4. **Wiring** -- each probe order becomes a linear probe chain (see
//!    [`wire_probe_chain`]); materialized multi-streams then shuffle their
//!    produced relation into their own store, and the root's producers feed
//!    the output stub.

use crate::error::PlanError;
use crate::physical::edges::{EdgeKind, EdgeLabel};
use crate::physical::graph::PhysicalGraph;
use crate::physical::nodes::{Node, NodeKind};
use crate::physical::rules::{BinaryPredicateEvaluation, Rule};
use crate::probe_order::ProbeOrder;
use crate::query::{BinaryPredicate, Relation};
use crate::tree::{MaterializationTree, MatMultiStream, MatSource, MtNode};
use std::collections::BTreeSet;

/// Build the physical graph for a finished materialization tree.
pub fn build(tree: &MaterializationTree) -> Result<PhysicalGraph, PlanError> {
    let mut graph = PhysicalGraph::new();
    let nodes = tree.walk();
    let root_index = nodes.len() - 1;

    // Phase 1: stubs.
    for node in &nodes {
        if let MtNode::MatSource(source) = node {
            graph.add_input_stub_for(&source.relation);
        }
    }
    let output_stub = graph.add_output_stub_for(tree.root.relation());

    // Phase 2: stores.
    for node in &nodes {
        match node {
            MtNode::MatSource(source) => add_source_store(&mut graph, source)?,
            MtNode::MatMultiStream(multi) => {
                add_multi_stream_store(&mut graph, multi);
            }
            MtNode::NonMatMultiStream(_) => {}
        }
    }

    // Phase 3: producer marking.
    for node in &nodes {
        if let Some(orders) = node.probe_orders() {
            for (order, _) in orders.inner.values() {
                if let Some(last) = order.steps.last() {
                    let store = graph.relation_store(&last.relation.name())?;
                    graph.add_relation_producer(node.relation(), store);
                }
            }
        }
    }

    // Phase 4: wiring.
    for (index, node) in nodes.iter().enumerate() {
        match node {
            MtNode::MatSource(_) => {}
            MtNode::MatMultiStream(multi) => {
                for (order, _) in multi.probe_orders.inner.values() {
                    wire_probe_chain(&mut graph, order, &multi.relation)?;
                }
                // The produced relation is shuffled into its own store.
                let store = graph.relation_store(&multi.relation.name())?;
                for producer in graph.producers_of(&multi.relation.name()) {
                    if producer == store {
                        continue;
                    }
                    let edge = graph.add_edge(producer, store, EdgeKind::Shuffle);
                    graph.add_rule(
                        producer,
                        Rule::RelationSend { relation: multi.relation.clone(), edge: edge.clone() },
                    );
                    graph.add_rule(
                        store,
                        Rule::RelationReceive { relation: multi.relation.clone(), edge },
                    );
                }
                if index == root_index {
                    let edge = graph.add_edge(store, output_stub, EdgeKind::Shuffle);
                    graph.add_rule(
                        store,
                        Rule::RelationSend { relation: multi.relation.clone(), edge },
                    );
                }
            }
            MtNode::NonMatMultiStream(multi) => {
                for (order, _) in multi.probe_orders.inner.values() {
                    wire_probe_chain(&mut graph, order, &multi.relation)?;
                }
                if index == root_index {
                    for producer in graph.producers_of(&multi.relation.name()) {
                        let edge = graph.add_edge(producer, output_stub, EdgeKind::Shuffle);
                        graph.add_rule(
                            producer,
                            Rule::RelationSend { relation: multi.relation.clone(), edge },
                        );
                    }
                }
            }
        }
    }

    Ok(graph)
}

/// Store for a base relation, fed from its input stub.
fn add_source_store(graph: &mut PhysicalGraph, source: &MatSource) -> Result<(), PlanError> {
    let store = graph.add_store(Node::new(
        source.relation.name(),
        source.parallelism,
        NodeKind::ThetaStore {
            relation: source.relation.clone(),
            partitioning: source.partitioning.clone(),
        },
    ));

    for producer in graph.producers_of(&source.relation.name()) {
        let edge = graph.add_edge(producer, store, EdgeKind::Shuffle);
        graph.add_rule(
            producer,
            Rule::RelationSend { relation: source.relation.clone(), edge: edge.clone() },
        );
        graph.add_rule(
            store,
            Rule::RelationReceive { relation: source.relation.clone(), edge },
        );
    }
    Ok(())
}

fn add_multi_stream_store(graph: &mut PhysicalGraph, multi: &MatMultiStream) {
    graph.add_store(Node::new(
        multi.relation.name(),
        multi.parallelism,
        NodeKind::ThetaStore {
            relation: multi.relation.clone(),
            partitioning: multi.partitioning.clone(),
        },
    ));
}

/// Decide how each predicate is evaluated at the given store.
///
/// The store holding the predicate's left alias gets a left-stored
/// evaluation (stored values on the left, the arriving tuple's attribute on
/// the right); the opposite store gets the mirror form.
pub fn evaluations_for_store(
    relation: &Relation,
    predicates: &BTreeSet<BinaryPredicate>,
) -> BTreeSet<BinaryPredicateEvaluation> {
    predicates
        .iter()
        .map(|predicate| {
            if relation.contains_alias(predicate.left_alias()) {
                BinaryPredicateEvaluation::LeftStored(predicate.clone())
            } else {
                BinaryPredicateEvaluation::RightStored(predicate.clone())
            }
        })
        .collect()
}

/// Wire one probe order as a linear chain through the stores.
///
/// For the order ⟨R, S, T⟩: every producer of R broadcasts into S's store
/// (send rule at the producer), S's store joins arrivals against its state
/// and forwards matches to T's store (intermediate-join rule), and T's store
/// emits the produced relation (join-result rule). The final store is
/// registered as a producer of the chain's result.
pub fn wire_probe_chain(
    graph: &mut PhysicalGraph,
    order: &ProbeOrder,
    produced: &Relation,
) -> Result<(), PlanError> {
    if order.steps.len() < 2 {
        return Ok(());
    }

    let first = &order.steps[0];
    let second_store = graph.relation_store(&order.steps[1].relation.name())?;
    let producers = graph.producers_of(&first.relation.name());
    if producers.is_empty() {
        return Err(PlanError::Configuration(format!(
            "no producer registered for relation '{}'",
            first.relation.name()
        )));
    }

    let mut incoming: Vec<EdgeLabel> = Vec::new();
    for producer in producers {
        let edge = graph.add_edge(producer, second_store, EdgeKind::All);
        graph.add_rule(
            producer,
            Rule::RelationSend { relation: first.relation.clone(), edge: edge.clone() },
        );
        incoming.push(edge);
    }

    for i in 1..order.steps.len() - 1 {
        let step = &order.steps[i];
        let store = graph.relation_store(&step.relation.name())?;
        let next_store = graph.relation_store(&order.steps[i + 1].relation.name())?;
        let evaluations = evaluations_for_store(&step.relation, &step.predicates);

        let outgoing = graph.add_edge(store, next_store, EdgeKind::All);
        for edge in &incoming {
            graph.add_rule(
                store,
                Rule::IntermediateJoin {
                    incoming: edge.clone(),
                    outgoing: outgoing.clone(),
                    predicates: evaluations.clone(),
                },
            );
        }
        incoming = vec![outgoing];
    }

    let last = &order.steps[order.steps.len() - 1];
    let store = graph.relation_store(&last.relation.name())?;
    let evaluations = evaluations_for_store(&last.relation, &last.predicates);
    for edge in incoming {
        graph.add_rule(
            store,
            Rule::JoinResult {
                incoming: edge,
                predicates: evaluations.clone(),
                relation: produced.clone(),
            },
        );
    }
    graph.add_relation_producer(produced, store);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristics::ManualCharacteristics;
    use crate::optimize::no_partitioning;
    use crate::optimize::OptimizationParameters;
    use crate::probe_order::{GreedyProbeOrder, ProbeOrderStrategy};
    use crate::query::relation_of;
    use crate::tree::{mat_source, NonMatMultiStream};

    fn chain_tree() -> MaterializationTree {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate("r", 100.0);
        dc.set_rate("s", 100.0);
        dc.set_rate("t", 100.0);
        dc.set_selectivity("r", "s", 0.01);
        dc.set_selectivity("s", "t", 0.01);
        let predicates = vec![
            BinaryPredicate::equality("r.x", "s.x"),
            BinaryPredicate::equality("s.y", "t.y"),
        ];
        let params = OptimizationParameters::default();
        let selection = no_partitioning();

        let children: Vec<MtNode> = ["r", "s", "t"]
            .iter()
            .map(|name| {
                MtNode::MatSource(
                    mat_source(&relation_of(name), &dc, &params, &selection).unwrap(),
                )
            })
            .collect();
        let child_relations: Vec<Relation> =
            children.iter().map(|c| c.relation().clone()).collect();
        let (probe_orders, probe_cost) = GreedyProbeOrder
            .optimize(&dc, &predicates, &child_relations, false)
            .unwrap();

        let mut result = relation_of("rst");
        result.inputs = child_relations
            .iter()
            .flat_map(|r| r.inputs.clone())
            .collect();
        result.join_predicates = predicates;

        MaterializationTree {
            root: MtNode::NonMatMultiStream(NonMatMultiStream {
                relation: result,
                children,
                probe_orders,
                probe_cost,
            }),
        }
    }

    #[test]
    fn flat_chain_builds_the_expected_graph() {
        let graph = build(&chain_tree()).unwrap();

        // One input stub per base relation, one output stub, one store each.
        assert_eq!(graph.input_stubs().len(), 3);
        assert!(graph.output_stub().is_some());
        assert_eq!(graph.relation_stores().len(), 3);

        // Edge labels are unique.
        let labels: BTreeSet<_> = graph.edges().iter().map(|e| e.label.clone()).collect();
        assert_eq!(labels.len(), graph.edges().len());

        // Every store insert travels over SHUFFLE, every probe over ALL.
        let shuffle_count = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Shuffle)
            .count();
        let all_count = graph.edges().iter().filter(|e| e.kind == EdgeKind::All).count();
        // 3 stub→store inserts plus one output edge per distinct chain-end
        // store (the r and t chains both end at t's store); per chain 2 ALL
        // edges for 3 roots.
        assert_eq!(shuffle_count, 5);
        assert_eq!(all_count, 6);

        // The final store of each chain carries a join-result rule.
        let result_rules: usize = graph
            .nodes()
            .map(|(_, node)| {
                node.rules
                    .iter()
                    .filter(|r| matches!(r, Rule::JoinResult { .. }))
                    .count()
            })
            .sum();
        assert_eq!(result_rules, 3);
    }

    #[test]
    fn probe_direction_matches_the_stored_side() {
        let predicates: BTreeSet<BinaryPredicate> =
            [BinaryPredicate::equality("r.x", "s.x")].into_iter().collect();
        let left = evaluations_for_store(&relation_of("r"), &predicates);
        assert!(matches!(
            left.iter().next().unwrap(),
            BinaryPredicateEvaluation::LeftStored(_)
        ));
        let right = evaluations_for_store(&relation_of("s"), &predicates);
        assert!(matches!(
            right.iter().next().unwrap(),
            BinaryPredicateEvaluation::RightStored(_)
        ));
    }
}

//! # Binary Theta Strategy
//!
//! The classic symmetric two-store join, built directly as a physical graph
//! without a materialization tree. Each relation's store persists its own
//! tuples (`SHUFFLE` insert path) and is probed by the other relation's
//! stream (`ALL` probe path); both stores emit joined results into the
//! output stub. Supports arbitrary theta predicates, since each store
//! evaluates the predicate in the direction matching its stored side.

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::builder::evaluations_for_store;
use joinplan_core::optimize::{
    CostEstimation, GlobalStrategy, OptimizationParameters, OptimizationResult,
};
use joinplan_core::physical::{EdgeKind, Node, NodeKind, PhysicalGraph, Rule};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::{AttributeAccess, BinaryPredicate, Query, Relation};
use joinplan_core::tree::{parallelism_for, storage_cost_for};
use std::collections::BTreeSet;

/// Symmetric two-store theta join.
#[derive(Debug)]
pub struct BinaryTheta;

impl GlobalStrategy for BinaryTheta {
    fn optimize(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        _probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<OptimizationResult, PlanError> {
        if query.relation_count() != 2 {
            return Err(PlanError::Configuration(format!(
                "the binary theta strategy cannot handle {} relations, it needs exactly 2",
                query.relation_count()
            )));
        }

        let aliases: Vec<_> = query.input_map.keys().cloned().collect();
        let rel_a = query.result.sub_relation(&aliases[0..1]);
        let rel_b = query.result.sub_relation(&aliases[1..2]);

        let parallelism_a = parallelism_for(&rel_a, characteristics, params.task_capacity)?;
        let parallelism_b = parallelism_for(&rel_b, characteristics, params.task_capacity)?;
        if parallelism_a + parallelism_b > params.available_tasks {
            return Err(PlanError::ResourceBudget(format!(
                "the two stores need {} tasks, but only {} are available",
                parallelism_a + parallelism_b,
                params.available_tasks
            )));
        }

        let mut graph = PhysicalGraph::new();

        // Input stubs, replaced with concrete sources by the runtime.
        let input_a = graph.add_input_stub_for(&rel_a);
        let input_b = graph.add_input_stub_for(&rel_b);

        let store_a = graph.add_store(theta_store(&rel_a, &query.result.join_predicates, parallelism_a));
        let store_b = graph.add_store(theta_store(&rel_b, &query.result.join_predicates, parallelism_b));

        // Insert path: each relation is shuffled into its own store.
        let insert_a = graph.add_edge(input_a, store_a, EdgeKind::Shuffle);
        graph.add_rule(input_a, Rule::RelationSend { relation: rel_a.clone(), edge: insert_a.clone() });
        graph.add_rule(store_a, Rule::RelationReceive { relation: rel_a.clone(), edge: insert_a });
        let insert_b = graph.add_edge(input_b, store_b, EdgeKind::Shuffle);
        graph.add_rule(input_b, Rule::RelationSend { relation: rel_b.clone(), edge: insert_b.clone() });
        graph.add_rule(store_b, Rule::RelationReceive { relation: rel_b.clone(), edge: insert_b });

        // Probe path: each stream is broadcast against the opposite store.
        let predicates: BTreeSet<BinaryPredicate> =
            query.result.join_predicates.iter().cloned().collect();
        let probe_a = graph.add_edge(input_b, store_a, EdgeKind::All);
        graph.add_rule(input_b, Rule::RelationSend { relation: rel_b.clone(), edge: probe_a.clone() });
        graph.add_rule(
            store_a,
            Rule::JoinResult {
                incoming: probe_a,
                predicates: evaluations_for_store(&rel_a, &predicates),
                relation: query.result.clone(),
            },
        );
        let probe_b = graph.add_edge(input_a, store_b, EdgeKind::All);
        graph.add_rule(input_a, Rule::RelationSend { relation: rel_a.clone(), edge: probe_b.clone() });
        graph.add_rule(
            store_b,
            Rule::JoinResult {
                incoming: probe_b,
                predicates: evaluations_for_store(&rel_b, &predicates),
                relation: query.result.clone(),
            },
        );

        graph.add_relation_producer(&query.result, store_a);
        graph.add_relation_producer(&query.result, store_b);

        // Both stores deliver results to the single output stub.
        let output = graph.add_output_stub_for(&query.result);
        let result_a = graph.add_edge(store_a, output, EdgeKind::Shuffle);
        graph.add_rule(store_a, Rule::RelationSend { relation: query.result.clone(), edge: result_a });
        let result_b = graph.add_edge(store_b, output, EdgeKind::Shuffle);
        graph.add_rule(store_b, Rule::RelationSend { relation: query.result.clone(), edge: result_b });

        // Storage: both stores' retained tuples. Probe traffic: every tuple
        // of each stream probes the opposite store once.
        let cost_estimation = CostEstimation {
            storage_cost: storage_cost_for(&rel_a, characteristics)?
                + storage_cost_for(&rel_b, characteristics)?,
            probe_cost: characteristics.get_rate(&aliases[0])?
                + characteristics.get_rate(&aliases[1])?,
            num_tasks: parallelism_a + parallelism_b,
        };

        Ok(OptimizationResult { physical_graph: graph, cost_estimation, tree: None })
    }
}

/// Theta store partitioned by the relation's side of its equality predicates.
fn theta_store(relation: &Relation, predicates: &[BinaryPredicate], parallelism: i64) -> Node {
    let partitioning: Vec<AttributeAccess> = predicates
        .iter()
        .filter_map(|p| match p {
            BinaryPredicate::Equality { left, right } => {
                if relation.contains_alias(&left.relation_alias) {
                    Some(left.clone())
                } else if relation.contains_alias(&right.relation_alias) {
                    Some(right.clone())
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect();
    Node::new(
        relation.name(),
        parallelism,
        NodeKind::ThetaStore { relation: relation.clone(), partitioning },
    )
}

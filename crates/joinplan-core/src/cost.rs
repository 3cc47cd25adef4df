//! # Cost Functions
//!
//! Aggregate cost measures over materialization trees. The two dimensions of
//! the estimate mirror what a continuously running join actually consumes:
//!
//! - **Storage**: tuples retained across all materialized stores. Each node
//!   carries the estimated size of its own store; the global figure is the
//!   sum over the tree.
//! - **Probe traffic**: tuples sent between stores while extending partial
//!   join results. Each multi-stream node carries the summed cost of its
//!   probe orders; the global figure again sums over the tree.
//!
//! Task accounting lives here as well: how many parallel instances a tree
//! occupies and the lower bound a query needs before any tree is built.

use crate::characteristics::DataCharacteristics;
use crate::error::PlanError;
use crate::optimize::CostEstimation;
use crate::query::{Query, Relation};
use crate::tree::{storage_cost_for, MaterializationTree, MtNode};

/// Tuples retained across all materialized stores of the subtree.
pub fn global_tuples_materialized(node: &MtNode) -> f64 {
    let own = if node.parallelism() == 0 { 0.0 } else { node.storage_cost() };
    own + node
        .children()
        .iter()
        .map(global_tuples_materialized)
        .sum::<f64>()
}

/// Probe tuples sent across all multi-stream operators of the subtree.
pub fn global_probe_tuples_sent(node: &MtNode) -> f64 {
    node.probe_cost()
        + node
            .children()
            .iter()
            .map(global_probe_tuples_sent)
            .sum::<f64>()
}

/// Parallel instances the subtree occupies.
pub fn global_num_tasks(node: &MtNode) -> i64 {
    node.parallelism()
        + node
            .children()
            .iter()
            .map(global_num_tasks)
            .sum::<i64>()
}

/// The full cost estimation of a finished tree.
pub fn cost_estimation_for(tree: &MaterializationTree) -> CostEstimation {
    CostEstimation {
        storage_cost: global_tuples_materialized(&tree.root),
        probe_cost: global_probe_tuples_sent(&tree.root),
        num_tasks: global_num_tasks(&tree.root),
    }
}

/// Store size of one base relation of the query, window-scaled.
pub fn tuples_materialized_for_relation(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
) -> Result<f64, PlanError> {
    storage_cost_for(relation, characteristics)
}

/// Lower bound on the tasks any plan for this query occupies: every base
/// relation must be materialized somewhere, each store instance holding at
/// most `task_capacity` tuples.
pub fn minimal_required_tasks(
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    task_capacity: i64,
) -> Result<i64, PlanError> {
    if task_capacity <= 0 {
        return Err(PlanError::Configuration(
            "task capacity must be positive".to_string(),
        ));
    }
    let mut required = 0;
    for base in query.result.base_relations() {
        let stored = tuples_materialized_for_relation(&base, characteristics)?;
        required += ((stored / task_capacity as f64).ceil() as i64).max(1);
    }
    Ok(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristics::ManualCharacteristics;
    use crate::probe_order::ProbeOrders;
    use crate::query::{relation_of, BinaryPredicate, Query, Relation, RelationAlias};
    use crate::tree::{MatMultiStream, MatSource, NonMatMultiStream};
    use std::collections::BTreeMap;

    fn leaf(name: &str, storage: f64, parallelism: i64) -> MtNode {
        MtNode::MatSource(MatSource {
            relation: relation_of(name),
            parallelism,
            partitioning: Vec::new(),
            storage_cost: storage,
        })
    }

    #[test]
    fn global_measures_sum_over_the_tree() {
        let inner = MtNode::MatMultiStream(MatMultiStream {
            relation: relation_of("rs"),
            children: vec![leaf("r", 100.0, 1), leaf("s", 200.0, 2)],
            parallelism: 3,
            partitioning: Vec::new(),
            storage_cost: 50.0,
            probe_orders: ProbeOrders::default(),
            probe_cost: 10.0,
        });
        let root = MtNode::NonMatMultiStream(NonMatMultiStream {
            relation: relation_of("rst"),
            children: vec![inner, leaf("t", 25.0, 1)],
            probe_orders: ProbeOrders::default(),
            probe_cost: 5.0,
        });

        assert_eq!(global_tuples_materialized(&root), 375.0);
        assert_eq!(global_probe_tuples_sent(&root), 15.0);
        assert_eq!(global_num_tasks(&root), 7);
    }

    #[test]
    fn minimal_required_tasks_counts_every_base_relation() {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate("r", 100.0);
        dc.set_rate("s", 100.0);
        dc.set_rate("t", 100.0);

        let mut inputs = BTreeMap::new();
        for name in ["r", "s", "t"] {
            inputs.extend(relation_of(name).inputs);
        }
        let query = Query::from_relation(Relation {
            inputs,
            filters: Vec::new(),
            join_predicates: vec![
                BinaryPredicate::equality("r.a", "s.a"),
                BinaryPredicate::equality("s.b", "t.b"),
            ],
            aggregations: Vec::new(),
            projections: Vec::new(),
            alias: RelationAlias::new("rst"),
        });

        // One task per relation even with unbounded capacity.
        assert_eq!(minimal_required_tasks(&query, &dc, i64::MAX).unwrap(), 3);
        // 100 tuples at 40 per task → 3 tasks each.
        assert_eq!(minimal_required_tasks(&query, &dc, 40).unwrap(), 9);
    }
}

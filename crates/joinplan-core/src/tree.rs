//! # Materialization Tree
//!
//! The materialization tree is the planner's intermediate plan form: a tree
//! whose inner nodes say which (sub)relations get their own store.
//!
//! - [`MatSource`] -- leaf; one base relation materialized into a partitioned
//!   store with a given parallelism.
//! - [`MatMultiStream`] -- inner node introducing a new materialized store
//!   over the join of its children, with its own parallelism, partitioning,
//!   storage cost, and probe orders.
//! - [`NonMatMultiStream`] -- inner node merging its children's probe results
//!   without state of its own; carries only probe orders and probe cost.
//!
//! [`TreeStrategy`] is the shape shared by all tree-producing global
//! strategies: build a tree, then let the common driver check the resource
//! budget, derive missing partitionings, and translate the tree into the
//! physical graph. The driver rejects over-budget plans with a typed error --
//! parallelism is never silently reduced to fit.

use crate::builder::build;
use crate::characteristics::DataCharacteristics;
use crate::cost::minimal_required_tasks;
use crate::error::PlanError;
use crate::estimator::estimate_size;
use crate::optimize::{
    CostEstimation, GlobalStrategy, OptimizationParameters, OptimizationResult,
    PartitioningSelection,
};
use crate::probe_order::{ProbeOrderStrategy, ProbeOrders};
use crate::query::{AttributeAccess, BinaryPredicate, Query, Relation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Leaf node: one base relation materialized into a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatSource {
    pub relation: Relation,
    pub parallelism: i64,
    pub partitioning: Vec<AttributeAccess>,
    pub storage_cost: f64,
}

/// Inner node with a store of its own for the joined relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatMultiStream {
    pub relation: Relation,
    pub children: Vec<MtNode>,
    pub parallelism: i64,
    pub partitioning: Vec<AttributeAccess>,
    pub storage_cost: f64,
    pub probe_orders: ProbeOrders,
    pub probe_cost: f64,
}

/// Inner node without a store: a stateless pipelined merge of its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonMatMultiStream {
    pub relation: Relation,
    pub children: Vec<MtNode>,
    pub probe_orders: ProbeOrders,
    pub probe_cost: f64,
}

/// Closed node type of the materialization tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MtNode {
    MatSource(MatSource),
    MatMultiStream(MatMultiStream),
    NonMatMultiStream(NonMatMultiStream),
}

impl MtNode {
    pub fn relation(&self) -> &Relation {
        match self {
            MtNode::MatSource(n) => &n.relation,
            MtNode::MatMultiStream(n) => &n.relation,
            MtNode::NonMatMultiStream(n) => &n.relation,
        }
    }

    pub fn children(&self) -> &[MtNode] {
        match self {
            MtNode::MatSource(_) => &[],
            MtNode::MatMultiStream(n) => &n.children,
            MtNode::NonMatMultiStream(n) => &n.children,
        }
    }

    /// Parallel instances of this node's store; 0 for non-materialized nodes.
    pub fn parallelism(&self) -> i64 {
        match self {
            MtNode::MatSource(n) => n.parallelism,
            MtNode::MatMultiStream(n) => n.parallelism,
            MtNode::NonMatMultiStream(_) => 0,
        }
    }

    pub fn partitioning(&self) -> &[AttributeAccess] {
        match self {
            MtNode::MatSource(n) => &n.partitioning,
            MtNode::MatMultiStream(n) => &n.partitioning,
            MtNode::NonMatMultiStream(_) => &[],
        }
    }

    /// Tuples this node's store retains; 0 for non-materialized nodes.
    pub fn storage_cost(&self) -> f64 {
        match self {
            MtNode::MatSource(n) => n.storage_cost,
            MtNode::MatMultiStream(n) => n.storage_cost,
            MtNode::NonMatMultiStream(_) => 0.0,
        }
    }

    pub fn probe_cost(&self) -> f64 {
        match self {
            MtNode::MatSource(_) => 0.0,
            MtNode::MatMultiStream(n) => n.probe_cost,
            MtNode::NonMatMultiStream(n) => n.probe_cost,
        }
    }

    pub fn probe_orders(&self) -> Option<&ProbeOrders> {
        match self {
            MtNode::MatSource(_) => None,
            MtNode::MatMultiStream(n) => Some(&n.probe_orders),
            MtNode::NonMatMultiStream(n) => Some(&n.probe_orders),
        }
    }
}

/// A query plan as a tree of materialization decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializationTree {
    pub root: MtNode,
}

impl MaterializationTree {
    /// All nodes in post order (children before parents).
    pub fn walk(&self) -> Vec<&MtNode> {
        fn post_order<'a>(node: &'a MtNode, out: &mut Vec<&'a MtNode>) {
            for child in node.children() {
                post_order(child, out);
            }
            out.push(node);
        }
        let mut nodes = Vec::new();
        post_order(&self.root, &mut nodes);
        nodes
    }

    /// Parenthesized leaf structure, e.g. `((r,s),t,u)`. Handy in tests and
    /// log lines.
    pub fn parenthesized(&self) -> String {
        fn fmt(node: &MtNode) -> String {
            if node.children().is_empty() {
                node.relation()
                    .aliases()
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            } else {
                format!(
                    "({})",
                    node.children().iter().map(fmt).collect::<Vec<_>>().join(",")
                )
            }
        }
        fmt(&self.root)
    }
}

/// Tuples a store for this relation retains: estimated size scaled by the
/// smallest window, or the raw size when every window is unbounded.
pub fn storage_cost_for(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
) -> Result<f64, PlanError> {
    let size = estimate_size(relation, characteristics)?;
    let multiplier = relation.window_multiplier();
    Ok(if multiplier == 0 { size } else { size * multiplier as f64 })
}

/// Parallel instances needed so that each holds at most `task_capacity`
/// tuples of the relation's store. At least 1.
pub fn parallelism_for(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
    task_capacity: i64,
) -> Result<i64, PlanError> {
    if task_capacity <= 0 {
        return Err(PlanError::Configuration(
            "task capacity must be positive".to_string(),
        ));
    }
    let storage = storage_cost_for(relation, characteristics)?;
    Ok(((storage / task_capacity as f64).ceil() as i64).max(1))
}

/// Build a [`MatSource`] for a base relation, with partitioning attributes
/// taken from the selection (none when unselected).
pub fn mat_source(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
    partitioning: &PartitioningSelection,
) -> Result<MatSource, PlanError> {
    let aliases: Vec<_> = relation.aliases().into_iter().collect();
    Ok(MatSource {
        parallelism: parallelism_for(relation, characteristics, params.task_capacity)?,
        partitioning: partitioning.get(&aliases).cloned().unwrap_or_default(),
        storage_cost: storage_cost_for(relation, characteristics)?,
        relation: relation.clone(),
    })
}

/// Run the probe-order strategy for a multi-stream over the given children.
pub fn multi_stream_parts(
    characteristics: &dyn DataCharacteristics,
    predicates: &[BinaryPredicate],
    children: &[MtNode],
    probe_order: &dyn ProbeOrderStrategy,
    cross_products_allowed: bool,
) -> Result<(ProbeOrders, f64), PlanError> {
    let child_relations: Vec<Relation> =
        children.iter().map(|c| c.relation().clone()).collect();
    probe_order.optimize(
        characteristics,
        predicates,
        &child_relations,
        cross_products_allowed,
    )
}

/// Assign partition keys to unpartitioned materialized inner stores.
///
/// A child joined by an equality predicate can be partitioned by its side of
/// that predicate, so probe tuples carrying the opposite side reach the right
/// instance. Sources keep whatever the strategy selected for them.
pub fn derive_partitioning(node: &mut MtNode) {
    let predicates: Vec<BinaryPredicate> = match node {
        MtNode::MatSource(_) => return,
        MtNode::MatMultiStream(n) => n.relation.join_predicates.clone(),
        MtNode::NonMatMultiStream(n) => n.relation.join_predicates.clone(),
    };

    let children: &mut Vec<MtNode> = match node {
        MtNode::MatSource(_) => return,
        MtNode::MatMultiStream(n) => &mut n.children,
        MtNode::NonMatMultiStream(n) => &mut n.children,
    };

    for child in children.iter_mut() {
        derive_partitioning(child);

        let multi = match child {
            MtNode::MatMultiStream(m) => m,
            _ => continue,
        };
        if !multi.partitioning.is_empty() {
            continue;
        }

        let child_aliases = multi.relation.aliases();
        let mut attributes: Vec<AttributeAccess> = Vec::new();
        for predicate in &predicates {
            if let BinaryPredicate::Equality { left, right } = predicate {
                let left_inside = child_aliases.contains(&left.relation_alias);
                let right_inside = child_aliases.contains(&right.relation_alias);
                if left_inside && !right_inside {
                    attributes.push(left.clone());
                }
                if right_inside && !left_inside {
                    attributes.push(right.clone());
                }
            }
        }
        multi.partitioning = attributes;
    }
}

/// A materialization tree plus its cost estimate, before graph translation.
#[derive(Debug, Clone)]
pub struct TreeOptimizationResult {
    pub tree: MaterializationTree,
    pub cost_estimation: CostEstimation,
}

/// Global strategies that plan via a materialization tree.
///
/// Implementors only build the tree; the blanket [`GlobalStrategy`]
/// implementation adds the budget checks, partitioning derivation, and the
/// physical-graph translation around it.
pub trait TreeStrategy: std::fmt::Debug {
    fn optimize_tree(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<TreeOptimizationResult, PlanError>;
}

impl<T: TreeStrategy> GlobalStrategy for T {
    fn optimize(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<OptimizationResult, PlanError> {
        check_available_tasks(query, characteristics, params)?;

        let mut result = self.optimize_tree(query, characteristics, params, probe_order)?;
        derive_partitioning(&mut result.tree.root);
        enforce_budget(&result.tree, params)?;

        debug!(
            shape = %result.tree.parenthesized(),
            storage = result.cost_estimation.storage_cost,
            probe = result.cost_estimation.probe_cost,
            tasks = result.cost_estimation.num_tasks,
            "materialization tree complete"
        );

        let physical_graph = build(&result.tree)?;
        Ok(OptimizationResult {
            physical_graph,
            cost_estimation: result.cost_estimation,
            tree: Some(result.tree),
        })
    }
}

/// Reject queries whose base relations alone already need more tasks than
/// are available, before any tree is built.
pub fn check_available_tasks(
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
) -> Result<(), PlanError> {
    let required = minimal_required_tasks(query, characteristics, params.task_capacity)?;
    if required > params.available_tasks {
        return Err(PlanError::ResourceBudget(format!(
            "this query requires {} tasks, but only {} are available",
            required, params.available_tasks
        )));
    }
    Ok(())
}

/// Reject finished trees that exceed the budget: total parallelism over the
/// available tasks, or any store instance over the per-task capacity.
pub fn enforce_budget(
    tree: &MaterializationTree,
    params: &OptimizationParameters,
) -> Result<(), PlanError> {
    let num_tasks = crate::cost::global_num_tasks(&tree.root);
    if num_tasks > params.available_tasks {
        return Err(PlanError::ResourceBudget(format!(
            "the plan occupies {} tasks, but only {} are available",
            num_tasks, params.available_tasks
        )));
    }

    for node in tree.walk() {
        let parallelism = node.parallelism();
        if parallelism == 0 {
            continue;
        }
        let per_instance = node.storage_cost() / parallelism as f64;
        if per_instance > params.task_capacity as f64 {
            return Err(PlanError::ResourceBudget(format!(
                "the store for '{}' needs {:.0} tuples per instance, but a task holds {}",
                node.relation().name(),
                per_instance,
                params.task_capacity
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristics::ManualCharacteristics;
    use crate::query::{relation_of, RelationAlias, WindowDefinition};

    #[test]
    fn storage_cost_scales_with_the_smallest_window() {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate("r", 100.0);

        let unbounded = relation_of("r");
        assert_eq!(storage_cost_for(&unbounded, &dc).unwrap(), 100.0);

        let mut windowed = relation_of("r");
        windowed
            .inputs
            .insert(RelationAlias::new("r"), WindowDefinition::seconds(30));
        assert_eq!(storage_cost_for(&windowed, &dc).unwrap(), 3000.0);
    }

    #[test]
    fn parallelism_covers_the_storage() {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate("r", 1000.0);
        let relation = relation_of("r");
        assert_eq!(parallelism_for(&relation, &dc, 400).unwrap(), 3);
        assert_eq!(parallelism_for(&relation, &dc, i64::MAX).unwrap(), 1);
        assert!(parallelism_for(&relation, &dc, 0).is_err());
    }

    #[test]
    fn post_order_walk_visits_children_first() {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate("r", 10.0);
        dc.set_rate("s", 10.0);
        let params = OptimizationParameters::default();
        let selection = crate::optimize::no_partitioning();

        let r = MtNode::MatSource(mat_source(&relation_of("r"), &dc, &params, &selection).unwrap());
        let s = MtNode::MatSource(mat_source(&relation_of("s"), &dc, &params, &selection).unwrap());
        let root = MtNode::NonMatMultiStream(NonMatMultiStream {
            relation: relation_of("root"),
            children: vec![r, s],
            probe_orders: ProbeOrders::default(),
            probe_cost: 0.0,
        });
        let tree = MaterializationTree { root };

        let names: Vec<_> = tree.walk().iter().map(|n| n.relation().name()).collect();
        assert_eq!(names, vec!["r", "s", "root"]);
        assert_eq!(tree.parenthesized(), "(r,s)");
    }
}

//! # Top-Down Strategy
//!
//! Starts from a flat plan and iteratively merges children of the root into
//! new materialized multi-streams until the system capacity is reached. To
//! keep the search space manageable the strategy restricts itself to linear
//! join graphs (chains): the inputs are treated as a sequence R₁ … Rₙ and
//! only contiguous ranges [i, j] are candidates for materialization. Each
//! round picks the contiguous range whose materialized store would be
//! cheapest; the round stops as soon as the storage or task budget would be
//! exceeded. The nested range structure is then converted into the
//! materialization tree. Runtime is O(n⁴) in the number of relations.

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::cost::cost_estimation_for;
use joinplan_core::error::PlanError;
use joinplan_core::estimator::Estimator;
use joinplan_core::optimize::{no_partitioning, OptimizationParameters};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::{Query, RelationAlias};
use joinplan_core::tree::{
    mat_source, multi_stream_parts, parallelism_for, storage_cost_for, MaterializationTree,
    MatMultiStream, MtNode, NonMatMultiStream, TreeOptimizationResult, TreeStrategy,
};
use tracing::debug;

/// Chain-restricted top-down materialization.
#[derive(Debug)]
pub struct TopDown;

/// A contiguous range of the linearized inputs, with nested sub-ranges.
/// Leaves cover a single index.
#[derive(Debug, Clone)]
struct RangeTree {
    left: usize,
    right: usize,
    aliases: Vec<RelationAlias>,
    children: Vec<RangeTree>,
}

impl TreeStrategy for TopDown {
    fn optimize_tree(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<TreeOptimizationResult, PlanError> {
        let aliases: Vec<RelationAlias> = query.input_map.keys().cloned().collect();
        let n = aliases.len();
        if n < 2 {
            return Err(PlanError::Configuration(format!(
                "the top-down strategy needs at least two relations, got {}",
                n
            )));
        }

        let leaves: Vec<RangeTree> = (0..n)
            .map(|i| RangeTree {
                left: i,
                right: i,
                aliases: vec![aliases[i].clone()],
                children: Vec::new(),
            })
            .collect();
        let mut current = RangeTree {
            left: 0,
            right: n - 1,
            aliases: aliases.clone(),
            children: leaves,
        };

        let max_capacity = params.total_capacity() as f64;
        let mut used_capacity = 0.0;
        let mut used_tasks = 0;
        for base in query.result.base_relations() {
            used_capacity += storage_cost_for(&base, characteristics)?;
            used_tasks += parallelism_for(&base, characteristics, params.task_capacity)?;
        }

        while used_capacity < max_capacity && used_tasks < params.available_tasks {
            let found = find_min_storage_range(&current, characteristics, n)?;
            let (i, j, storage) = match found {
                Some(triple) => triple,
                None => break,
            };
            let tasks = ((storage / params.task_capacity as f64).ceil() as i64).max(1);
            if used_capacity + storage > max_capacity
                || used_tasks + tasks > params.available_tasks
            {
                break;
            }
            debug!(from = i, to = j, storage, "materializing range");
            used_capacity += storage;
            used_tasks += tasks;
            current = materialize(&current, i, j);
        }

        let root = build_root(&current, query, characteristics, params, probe_order)?;
        let tree = MaterializationTree { root };
        let cost_estimation = cost_estimation_for(&tree);
        Ok(TreeOptimizationResult { tree, cost_estimation })
    }
}

/// The valid contiguous range [i, j] whose materialized store is cheapest,
/// or `None` when no further merge is possible.
fn find_min_storage_range(
    tree: &RangeTree,
    characteristics: &dyn DataCharacteristics,
    n: usize,
) -> Result<Option<(usize, usize, f64)>, PlanError> {
    let estimator = Estimator::new(characteristics);
    let mut best: Option<(usize, usize, f64)> = None;

    for i in 0..n.saturating_sub(1) {
        for j in i..n {
            if !valid(tree, i, j) {
                continue;
            }
            let storage = estimator.estimate_alias_size(&tree.aliases[i..=j])?;
            if best.as_ref().map_or(true, |(_, _, b)| storage < *b) {
                best = Some((i, j, storage));
            }
        }
    }
    Ok(best)
}

/// A range is valid when it spans at least two positions, changes the tree,
/// and aligns with existing child boundaries (or lies fully inside a child,
/// in which case the child decides).
fn valid(tree: &RangeTree, i: usize, j: usize) -> bool {
    if i >= j {
        return false;
    }
    if tree.left == i && tree.right == j {
        return false;
    }
    for child in &tree.children {
        if i >= child.left && j <= child.right {
            return valid(child, i, j);
        }
    }
    tree.children.iter().any(|c| c.left == i) && tree.children.iter().any(|c| c.right == j)
}

/// Introduce a materialization boundary around [i, j].
fn materialize(tree: &RangeTree, i: usize, j: usize) -> RangeTree {
    for (index, child) in tree.children.iter().enumerate() {
        if i >= child.left && j <= child.right {
            let mut children = tree.children.clone();
            children[index] = materialize(child, i, j);
            return RangeTree {
                left: tree.left,
                right: tree.right,
                aliases: tree.aliases.clone(),
                children,
            };
        }
    }

    let first = tree
        .children
        .iter()
        .position(|c| c.left == i)
        .unwrap_or(0);
    let last = tree
        .children
        .iter()
        .position(|c| c.right == j)
        .unwrap_or(tree.children.len() - 1);

    let merged = RangeTree {
        left: i,
        right: j,
        aliases: tree.aliases[i - tree.left..=j - tree.left].to_vec(),
        children: tree.children[first..=last].to_vec(),
    };
    let mut children = tree.children[..first].to_vec();
    children.push(merged);
    children.extend_from_slice(&tree.children[last + 1..]);
    RangeTree {
        left: tree.left,
        right: tree.right,
        aliases: tree.aliases.clone(),
        children,
    }
}

fn build_root(
    tree: &RangeTree,
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
    probe_order: &dyn ProbeOrderStrategy,
) -> Result<MtNode, PlanError> {
    let children = tree
        .children
        .iter()
        .map(|child| build_node(child, query, characteristics, params, probe_order))
        .collect::<Result<Vec<_>, _>>()?;
    let (probe_orders, probe_cost) = multi_stream_parts(
        characteristics,
        &query.result.join_predicates,
        &children,
        probe_order,
        params.cross_products_allowed,
    )?;
    Ok(MtNode::NonMatMultiStream(NonMatMultiStream {
        relation: query.result.clone(),
        children,
        probe_orders,
        probe_cost,
    }))
}

fn build_node(
    tree: &RangeTree,
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
    probe_order: &dyn ProbeOrderStrategy,
) -> Result<MtNode, PlanError> {
    if tree.left == tree.right {
        let relation = query.result.sub_relation(&tree.aliases);
        return Ok(MtNode::MatSource(mat_source(
            &relation,
            characteristics,
            params,
            &no_partitioning(),
        )?));
    }

    let children = tree
        .children
        .iter()
        .map(|child| build_node(child, query, characteristics, params, probe_order))
        .collect::<Result<Vec<_>, _>>()?;
    let relation = query.result.sub_relation(&tree.aliases);
    let (probe_orders, probe_cost) = multi_stream_parts(
        characteristics,
        &relation.join_predicates,
        &children,
        probe_order,
        params.cross_products_allowed,
    )?;
    Ok(MtNode::MatMultiStream(MatMultiStream {
        parallelism: parallelism_for(&relation, characteristics, params.task_capacity)?,
        partitioning: Vec::new(),
        storage_cost: storage_cost_for(&relation, characteristics)?,
        probe_orders,
        probe_cost,
        children,
        relation,
    }))
}

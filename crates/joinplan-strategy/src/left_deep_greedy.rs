//! # Left-Deep Greedy Strategy
//!
//! Two phases:
//!
//! 1. **Order search.** For every choice of starting relation, greedily
//!    append the relation that keeps the running join size smallest; the
//!    cheapest complete order wins. Extensions without a connecting
//!    predicate are skipped unless cross products are allowed.
//! 2. **Tree construction.** Walk the winning order left to right,
//!    materializing each intermediate join into its own store as long as the
//!    storage and task budget lasts. The relations that no longer fit are
//!    attached unmaterialized to an n-ary merge root:
//!
//! ```text
//!          merge
//!        /   |   \
//!      (ab)  c    d
//!      /  \
//!     a    b
//! ```

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::cost::{cost_estimation_for, minimal_required_tasks, tuples_materialized_for_relation};
use joinplan_core::error::PlanError;
use joinplan_core::estimator::{estimate_size, join_size};
use joinplan_core::optimize::{no_partitioning, OptimizationParameters};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::{
    is_cross_product, join_relations, Query, Relation, RelationAlias,
};
use joinplan_core::tree::{
    mat_source, multi_stream_parts, parallelism_for, storage_cost_for, MaterializationTree,
    MatMultiStream, MtNode, NonMatMultiStream, TreeOptimizationResult, TreeStrategy,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Left-deep materialization with greedy join ordering.
#[derive(Debug)]
pub struct LeftDeepGreedy;

impl TreeStrategy for LeftDeepGreedy {
    fn optimize_tree(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<TreeOptimizationResult, PlanError> {
        let order = greedy_order(query, characteristics, params)?;
        debug!(
            order = %order.iter().map(|r| r.name()).collect::<Vec<_>>().join(","),
            "left-deep join order chosen"
        );
        let tree = left_deep_for(query, &order, characteristics, params, probe_order)?;
        let cost_estimation = cost_estimation_for(&tree);
        Ok(TreeOptimizationResult { tree, cost_estimation })
    }
}

/// For each choice of starting relation, build the greedy order rooted
/// there; return the order with the smallest accumulated intermediate size.
fn greedy_order(
    query: &Query,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
) -> Result<Vec<Relation>, PlanError> {
    let base = query.result.base_relations();
    if base.len() < 2 {
        return Err(PlanError::Configuration(format!(
            "the left-deep strategy needs at least two relations, got {}",
            base.len()
        )));
    }
    let predicates = &query.result.join_predicates;

    let mut best_order: Option<Vec<Relation>> = None;
    let mut best_cost = f64::INFINITY;

    for start in &base {
        let mut joined = vec![start.clone()];
        let mut joined_aliases: BTreeSet<RelationAlias> = start.aliases();
        let mut remaining: Vec<Relation> =
            base.iter().filter(|r| r.name() != start.name()).cloned().collect();
        let mut cost = 0.0;

        while !remaining.is_empty() {
            let mut candidates: Vec<usize> = (0..remaining.len())
                .filter(|&i| {
                    params.cross_products_allowed
                        || !is_cross_product(predicates, &joined, &remaining[i])
                })
                .collect();
            if candidates.is_empty() {
                return Err(PlanError::Configuration(
                    "the query graph is disconnected and cross products are not allowed"
                        .to_string(),
                ));
            }

            let mut chosen = candidates.remove(0);
            let mut chosen_size = {
                let mut extended = joined_aliases.clone();
                extended.extend(remaining[chosen].aliases());
                join_size(characteristics, &extended)?
            };
            for i in candidates {
                let mut extended = joined_aliases.clone();
                extended.extend(remaining[i].aliases());
                let size = join_size(characteristics, &extended)?;
                if size < chosen_size {
                    chosen = i;
                    chosen_size = size;
                }
            }

            let next = remaining.remove(chosen);
            joined_aliases.extend(next.aliases());
            joined.push(next);
            cost += chosen_size;
        }

        if cost < best_cost {
            best_cost = cost;
            best_order = Some(joined);
        }
    }

    // At least one start succeeds whenever the loop above never errored.
    best_order.ok_or_else(|| {
        PlanError::Configuration("no join order could be constructed".to_string())
    })
}

/// Build the left-deep tree bottom-up along the given order, materializing
/// intermediate joins while the budget lasts; the remainder joins the n-ary
/// merge root unmaterialized.
fn left_deep_for(
    query: &Query,
    order: &[Relation],
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
    probe_order: &dyn ProbeOrderStrategy,
) -> Result<MaterializationTree, PlanError> {
    let predicates = &query.result.join_predicates;
    let partitioning = no_partitioning();

    let mut current = MtNode::MatSource(mat_source(
        &order[0],
        characteristics,
        params,
        &partitioning,
    )?);
    let mut materialized_tuples = {
        let mut sum = 0.0;
        for relation in order {
            sum += estimate_size(relation, characteristics)?;
        }
        sum
    };
    let mut used_tasks = minimal_required_tasks(query, characteristics, params.task_capacity)?;

    let mut i = 1;
    while i < order.len() - 1 {
        let joined = join_relations(current.relation(), &order[i], predicates);
        let new_store = tuples_materialized_for_relation(&joined, characteristics)?;
        let new_tasks =
            ((new_store / params.task_capacity as f64).ceil() as i64).max(1);
        if materialized_tuples + new_store > params.total_capacity() as f64
            || used_tasks + new_tasks > params.available_tasks
        {
            // No room to materialize the next intermediate result.
            break;
        }

        let right = MtNode::MatSource(mat_source(
            &order[i],
            characteristics,
            params,
            &partitioning,
        )?);
        let children = vec![current, right];
        let (probe_orders, probe_cost) = multi_stream_parts(
            characteristics,
            &joined.join_predicates,
            &children,
            probe_order,
            params.cross_products_allowed,
        )?;
        current = MtNode::MatMultiStream(MatMultiStream {
            parallelism: parallelism_for(&joined, characteristics, params.task_capacity)?,
            partitioning: Vec::new(),
            storage_cost: storage_cost_for(&joined, characteristics)?,
            probe_orders,
            probe_cost,
            children,
            relation: joined,
        });

        materialized_tuples += new_store;
        used_tasks += new_tasks;
        i += 1;
    }

    // The rest becomes children of the non-materialized root.
    let mut children = vec![current];
    for relation in &order[i..] {
        children.push(MtNode::MatSource(mat_source(
            relation,
            characteristics,
            params,
            &partitioning,
        )?));
    }
    let (probe_orders, probe_cost) = multi_stream_parts(
        characteristics,
        &query.result.join_predicates,
        &children,
        probe_order,
        params.cross_products_allowed,
    )?;

    Ok(MaterializationTree {
        root: MtNode::NonMatMultiStream(NonMatMultiStream {
            relation: query.result.clone(),
            children,
            probe_orders,
            probe_cost,
        }),
    })
}

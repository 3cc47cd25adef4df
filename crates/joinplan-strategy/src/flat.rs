//! # Flat Strategy
//!
//! Minimal materialization: every base relation gets its own store, and a
//! single non-materialized multi-stream merges them. For the query
//! R ⋈ S ⋈ T ⋈ U the tree is
//!
//! ```text
//!        merge
//!      / |  | \
//!     R  S  T  U
//! ```
//!
//! No intermediate result is ever stored, so storage cost is the sum of the
//! base stores and all optimization effort goes into the probe orders.

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::cost::cost_estimation_for;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{no_partitioning, OptimizationParameters, PartitioningSelection};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::{Query, Relation};
use joinplan_core::tree::{
    mat_source, multi_stream_parts, MaterializationTree, MtNode, NonMatMultiStream,
    TreeOptimizationResult, TreeStrategy,
};

/// The flat tree strategy, without partitioning of the base stores.
#[derive(Debug)]
pub struct Flat;

impl TreeStrategy for Flat {
    fn optimize_tree(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<TreeOptimizationResult, PlanError> {
        let tree = create_flat_tree(
            &query.result,
            characteristics,
            params,
            probe_order,
            &no_partitioning(),
        )?;
        let cost_estimation = cost_estimation_for(&tree);
        Ok(TreeOptimizationResult { tree, cost_estimation })
    }
}

/// Create a flat materialization tree: a single non-materializing
/// multi-stream root with materializing sources as children.
///
/// Other strategies use this as the starting point for iterative tree
/// construction.
pub fn create_flat_tree(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
    params: &OptimizationParameters,
    probe_order: &dyn ProbeOrderStrategy,
    partitioning: &PartitioningSelection,
) -> Result<MaterializationTree, PlanError> {
    let children: Vec<MtNode> = relation
        .base_relations()
        .iter()
        .map(|base| {
            Ok(MtNode::MatSource(mat_source(
                base,
                characteristics,
                params,
                partitioning,
            )?))
        })
        .collect::<Result<_, PlanError>>()?;

    let (probe_orders, probe_cost) = multi_stream_parts(
        characteristics,
        &relation.join_predicates,
        &children,
        probe_order,
        params.cross_products_allowed,
    )?;

    Ok(MaterializationTree {
        root: MtNode::NonMatMultiStream(NonMatMultiStream {
            relation: relation.clone(),
            children,
            probe_orders,
            probe_cost,
        }),
    })
}

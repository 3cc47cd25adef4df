//! # Single-Input Aggregation Strategy (declared, unfinished)
//!
//! The intended pipeline for a one-relation aggregation query is
//!
//! ```text
//! INPUT --SHUFFLE--> SELECT/PROJECT --GROUP_BY--> AGGREGATION --> OUTPUT
//! ```
//!
//! with a select/project rule applying the relation's filters and
//! projections before grouping. The rule format for the aggregation store
//! itself is not specified, and without it the graph would be incomplete --
//! so after validating the relation count this strategy fails explicitly
//! instead of emitting a partial graph.

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{GlobalStrategy, OptimizationParameters, OptimizationResult};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::Query;

/// Filter → project → aggregate pipeline for a single input relation.
/// Unfinished: the aggregation-store wiring is not specified.
#[derive(Debug)]
pub struct SingleInputAggregation;

impl GlobalStrategy for SingleInputAggregation {
    fn optimize(
        &self,
        query: &Query,
        _characteristics: &dyn DataCharacteristics,
        _params: &OptimizationParameters,
        _probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<OptimizationResult, PlanError> {
        if query.relation_count() != 1 {
            return Err(PlanError::Configuration(format!(
                "the single-input aggregation strategy cannot handle joins; it needs \
                 exactly 1 relation, got {}",
                query.relation_count()
            )));
        }

        Err(PlanError::UnimplementedStrategy(
            "single-input aggregation is declared but the aggregation-store rule \
             wiring is not implemented"
                .to_string(),
        ))
    }
}

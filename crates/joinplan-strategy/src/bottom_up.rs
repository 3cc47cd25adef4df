//! # Bottom-Up Strategy (declared, unfinished)
//!
//! The level-wise dynamic-programming tree search: level k holds candidate
//! trees joining k relations, each level is pruned to its best entries, and
//! surviving trees are combined upward until level n. Exponential in the
//! relation count.
//!
//! The combination and pruning machinery is not implemented yet; resolving
//! this strategy fails explicitly rather than emitting a partial plan.

use joinplan_core::characteristics::DataCharacteristics;
use joinplan_core::error::PlanError;
use joinplan_core::optimize::{GlobalStrategy, OptimizationParameters, OptimizationResult};
use joinplan_core::probe_order::ProbeOrderStrategy;
use joinplan_core::query::Query;

/// Level-wise bottom-up tree search. Unfinished.
#[derive(Debug)]
pub struct BottomUp;

impl GlobalStrategy for BottomUp {
    fn optimize(
        &self,
        _query: &Query,
        _characteristics: &dyn DataCharacteristics,
        _params: &OptimizationParameters,
        _probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<OptimizationResult, PlanError> {
        Err(PlanError::UnimplementedStrategy(
            "the bottom-up dynamic-programming strategy is declared but its level \
             combination and pruning are not implemented"
                .to_string(),
        ))
    }
}

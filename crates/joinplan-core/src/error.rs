//! # Planner Errors
//!
//! One closed error type covers every way an optimization run can fail. All
//! errors propagate synchronously to the caller; the planner performs no
//! internal retry or recovery, and no partial plan ever accompanies an error.

/// Errors raised by the planner.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The configuration cannot be executed as given: unknown strategy name,
    /// a relation count the chosen strategy does not support, or a
    /// disconnected predicate graph while cross products are disallowed.
    #[error("cannot optimize: {0}")]
    Configuration(String),

    /// The plan needs more resources than the caller granted: total
    /// parallelism exceeds the available tasks, or a single store instance
    /// would exceed the per-task capacity. The planner never silently clamps
    /// parallelism to fit.
    #[error("resource budget exceeded: {0}")]
    ResourceBudget(String),

    /// A required statistic is absent and the backing characteristics define
    /// no default for it. Rates have no default; selectivities default to 1.0
    /// and never produce this error.
    #[error("missing statistic: {0}")]
    MissingStatistic(String),

    /// A declared strategy whose implementation is not finished. Surfaced
    /// explicitly instead of emitting an incomplete plan.
    #[error("strategy not implemented: {0}")]
    UnimplementedStrategy(String),
}

//! # Optimization Parameters, Results, and Strategy Traits
//!
//! Callers describe *what* to optimize with (a query and data
//! characteristics) and *how* (an [`OptimizationParameters`] value naming the
//! global strategy, the probe-order strategy, and the resource budget). The
//! parameter struct is pure data -- strategy names plus free-form parameter
//! maps -- so it can travel over JSON unchanged; resolution to concrete
//! strategy instances happens in the registration tables of
//! `joinplan-strategy`, once per optimization run.

use crate::characteristics::DataCharacteristics;
use crate::error::PlanError;
use crate::physical::graph::PhysicalGraph;
use crate::probe_order::ProbeOrderStrategy;
use crate::query::{AttributeAccess, Query, RelationAlias};
use crate::tree::MaterializationTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A strategy choice: a registered name plus free-form parameters that the
/// resolved strategy parses into its own typed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl StrategySelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: BTreeMap::new() }
    }
}

/// Resource budget and strategy choices for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParameters {
    /// Tuples a single task can hold or process.
    pub task_capacity: i64,
    /// Tasks the cluster offers in total.
    pub available_tasks: i64,
    pub global_strategy: StrategySelection,
    pub probe_order_strategy: StrategySelection,
    /// Whether plans may cross-join disconnected query-graph components.
    pub cross_products_allowed: bool,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            task_capacity: i64::MAX,
            available_tasks: i64::MAX,
            global_strategy: StrategySelection::named("Flat"),
            probe_order_strategy: StrategySelection::named("Greedy"),
            cross_products_allowed: false,
        }
    }
}

impl OptimizationParameters {
    /// Total tuples the cluster can hold across all tasks.
    pub fn total_capacity(&self) -> i64 {
        self.task_capacity.saturating_mul(self.available_tasks)
    }
}

/// The planner's resource estimate for a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimation {
    /// Tuples retained across all materialized stores.
    pub storage_cost: f64,
    /// Probe tuples sent between stores.
    pub probe_cost: f64,
    /// Tasks the plan occupies.
    pub num_tasks: i64,
}

/// A successful optimization: the physical graph handed to the runtime
/// translator, its cost estimate, and -- for inspection tooling -- the
/// materialization tree the graph was derived from (absent for strategies
/// that build their graph directly).
#[derive(Debug)]
pub struct OptimizationResult {
    pub physical_graph: PhysicalGraph,
    pub cost_estimation: CostEstimation,
    pub tree: Option<MaterializationTree>,
}

/// A global strategy turns a query into a full optimization result,
/// internally deciding store boundaries, partitioning, and parallelism.
pub trait GlobalStrategy: std::fmt::Debug {
    fn optimize(
        &self,
        query: &Query,
        characteristics: &dyn DataCharacteristics,
        params: &OptimizationParameters,
        probe_order: &dyn ProbeOrderStrategy,
    ) -> Result<OptimizationResult, PlanError>;
}

/// Choice of partitioning attributes per alias list. Strategies that do not
/// partition pass [`no_partitioning`].
pub type PartitioningSelection = BTreeMap<Vec<RelationAlias>, Vec<AttributeAccess>>;

pub fn no_partitioning() -> PartitioningSelection {
    PartitioningSelection::new()
}

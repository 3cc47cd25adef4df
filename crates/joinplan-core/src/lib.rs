//! # joinplan-core: Stream-Join Planner Core
//!
//! This crate implements the core data structures and algorithms for a
//! cost-based planner for distributed continuous multi-way stream joins.
//! Given a join query and statistics about input rates and pairwise
//! selectivities, the planner decides which (sub)relations are materialized
//! into partitioned stores, how parallel each store is, and in which order
//! probe tuples traverse the stores -- and translates that decision into an
//! explicit operator graph consumable by an execution engine.
//!
//! ## Module Overview
//!
//! - **`query`**: The query model -- relations, aliases, attribute accesses,
//!   unary/binary predicates, windows, aggregations, projections.
//! - **`characteristics`**: Read-only statistics sources mapping relation
//!   aliases to rates and alias pairs to join selectivities.
//! - **`estimator`**: Cardinality estimation for arbitrary alias subsets and
//!   derived relations from rates and selectivities.
//! - **`probe_order`**: The probe-order search -- per join root, the order in
//!   which the remaining stores are probed, found exhaustively or greedily.
//! - **`tree`**: The materialization tree -- which relations get their own
//!   store, with what parallelism and partitioning -- and the shared driver
//!   that turns a tree strategy into a full optimization run.
//! - **`cost`**: Cost functions over materialization trees (tuples stored,
//!   probe tuples sent, tasks required).
//! - **`physical`**: The physical graph model -- typed nodes, typed edges,
//!   declarative per-node rules.
//! - **`builder`**: Translation of a materialization tree into a physical
//!   graph.
//! - **`optimize`**: Optimization parameters, results, and the strategy
//!   traits implemented by `joinplan-strategy`.
//! - **`error`**: The closed error type shared by all planner components.

pub mod builder;
pub mod characteristics;
pub mod cost;
pub mod error;
pub mod estimator;
pub mod optimize;
pub mod physical;
pub mod presets;
pub mod probe_order;
pub mod query;
pub mod tree;

//! # joinplan-inspect: Descriptive Exports
//!
//! Read-only views of planner output for inspection tooling:
//!
//! - **`tree_json`**: materialization trees as nested JSON objects, plus a
//!   shape parser so tooling round-trips are testable.
//! - **`graph_json`**: physical graphs as `{nodes, edges}` documents.
//! - **`dot`**: physical graphs as Graphviz DOT.
//!
//! Everything here derives from the immutable optimization result; nothing
//! feeds back into planning.

pub mod dot;
pub mod graph_json;
pub mod tree_json;

/// Errors raised while re-reading exported documents.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// The document is not shaped like an exported materialization tree.
    #[error("malformed tree document: {0}")]
    MalformedTree(String),
}

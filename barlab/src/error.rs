use crate::data::{Bar, FeedError};
use barlab_ta::indicator::BindError;
use smol_str::SmolStr;
use thiserror::Error;

/// Fatal errors of the engine core.
///
/// Per-bar data issues only surface here when `strict_data` is enabled;
/// otherwise they are logged and the bar is skipped. Numeric degeneracy is
/// never an error (it propagates as NaN through the line substrate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("feed '{feed}': {source}")]
    Feed { feed: SmolStr, source: FeedError },

    #[error("invalid bar on feed '{feed}' at bar {index}: {bar:?}")]
    DataIntegrity {
        feed: SmolStr,
        index: usize,
        bar: Bar,
    },

    #[error("indicator graph: {0}")]
    Graph(#[from] GraphError),

    #[error("indicator binding: {0}")]
    Bind(#[from] BindError),

    #[error("configuration: {0}")]
    Config(String),
}

/// Structural defects of the indicator graph, detected at bootstrap.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
pub enum GraphError {
    #[error("cycle detected involving indicator node {node}")]
    Cycle { node: usize },

    #[error("indicator node {node} references unallocated series {series}")]
    DanglingInput { node: usize, series: usize },
}

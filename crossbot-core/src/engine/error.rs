//! Engine errors. Each one aborts the run: they indicate a broken data
//! contract or an explicit stop request, never a recoverable per-bar condition.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("bar {bar_index} has a non-finite close or indicator field")]
    IncompleteBar { bar_index: usize },

    #[error("bar {bar_index} timestamp {timestamp} does not follow the previous bar")]
    NonMonotonic { bar_index: usize, timestamp: String },

    #[error("run cancelled before bar {bar_index}")]
    Cancelled { bar_index: usize },
}

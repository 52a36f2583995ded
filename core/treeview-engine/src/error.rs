//! FILENAME: core/treeview-engine/src/error.rs

use datasource::{BoxError, DataSourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeviewError {
    /// The definition names a field the source does not have, or a
    /// reducer nobody registered. Raised before any node is created.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Row {row} out of range (row count {count})")]
    RowOutOfRange { row: usize, count: usize },

    /// The cell is a group row or the tree column.
    #[error("Cell ({column}, {row}) has no source cell")]
    NotASourceCell { column: usize, row: usize },

    #[error("Row {0} is not a group row")]
    NotAGroup(usize),

    #[error(transparent)]
    Source(#[from] DataSourceError),

    /// Error raised by a custom reducer, passed through as-is.
    #[error(transparent)]
    Reducer(BoxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TreeviewError>;

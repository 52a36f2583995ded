//! FILENAME: core/datasource/src/error.rs

use thiserror::Error;

/// Boxed error produced by caller-supplied collaborators (filter predicates,
/// custom reducers). Passed through to the caller as-is.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Row {row} out of range (row count {count})")]
    RowOutOfRange { row: usize, count: usize },

    #[error("Column {column} out of range (column count {count})")]
    ColumnOutOfRange { column: usize, count: usize },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Predicate(BoxError),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

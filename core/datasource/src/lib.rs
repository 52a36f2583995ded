//! FILENAME: core/datasource/src/lib.rs
//! PURPOSE: Main library entry point for the flat data layer of the grid.
//! CONTEXT: Re-exports the value model, the `DataSource` contract, the row
//! store and the row filter for use by the treeview engine.

pub mod error;
pub mod filter;
pub mod headerify;
pub mod source;
pub mod store;
pub mod value;

// Re-export commonly used types at the crate root
pub use error::{BoxError, DataSourceError, Result};
pub use filter::{DataFilter, Predicate, RowFilter};
pub use source::DataSource;
pub use store::RowStore;
pub use value::{compare_values, Row, Value};

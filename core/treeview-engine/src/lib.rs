//! FILENAME: core/treeview-engine/src/lib.rs
//! Grouped tree-view subsystem for the data grid.
//!
//! Turns a flat row source plus an ordered list of grouping keys into a
//! navigable tree of group and leaf nodes, and flattens it (respecting
//! expand/collapse) into a view addressed like the flat source.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the treeview IS)
//! - `node`, `tree`: The hierarchy and how rows are partitioned into it
//! - `aggregator`, `sorter`: Rollups and ordering over the hierarchy
//! - `treeview`, `filter`: The orchestrators answering the flat contract

pub mod aggregator;
pub mod definition;
pub mod error;
pub mod filter;
pub mod key;
pub mod node;
pub mod sorter;
pub mod tree;
pub mod treeview;

pub use aggregator::{AggregateAccumulator, Aggregator, ReducerFn};
pub use definition::*;
pub use error::{Result, TreeviewError};
pub use filter::TreeviewFilter;
pub use key::{GroupPath, GroupValue, OrderedFloat};
pub use node::{DrillDown, GroupNode, LeafNode, Node, NodePath};
pub use sorter::{GroupSorter, SorterComposite};
pub use tree::Tree;
pub use treeview::Treeview;

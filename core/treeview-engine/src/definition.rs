//! FILENAME: core/treeview-engine/src/definition.rs
//! Treeview Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a treeview:
//! which fields group the rows, which rollups appear on group rows,
//! how the view is sorted and how the tree column is drawn.
//! Field references are by name and are resolved against the source
//! at build time.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Index into the source data columns (0-based).
pub type FieldIndex = usize;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported rollups for group rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    Sum,
    Count,
    Average,
    Min,
    Max,
    /// A reducer registered on the `Aggregator` under this name.
    Custom(String),
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Sum
    }
}

/// A rollup shown on group rows for one source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    /// Source field name.
    pub field: String,

    /// The reducer to apply.
    #[serde(default)]
    pub aggregation: AggregationType,
}

impl AggregateSpec {
    pub fn new(field: impl Into<String>, aggregation: AggregationType) -> Self {
        AggregateSpec {
            field: field.into(),
            aggregation,
        }
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

/// One link of a sort chain: a source column and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSort {
    pub column: FieldIndex,
    #[serde(default)]
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn new(column: FieldIndex, direction: SortDirection) -> Self {
        ColumnSort { column, direction }
    }

    pub fn ascending(column: FieldIndex) -> Self {
        ColumnSort::new(column, SortDirection::Ascending)
    }

    pub fn descending(column: FieldIndex) -> Self {
        ColumnSort::new(column, SortDirection::Descending)
    }
}

// ============================================================================
// TREE COLUMN RENDERING
// ============================================================================

/// Strings used to draw column 0 of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeGlyphs {
    /// Repeated once per depth level.
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Prefix of a collapsed group's label.
    #[serde(default = "default_collapsed")]
    pub collapsed: String,
}

fn default_indent() -> String {
    "   ".to_string()
}

fn default_collapsed() -> String {
    "\u{25b8} ".to_string()
}

impl Default for TreeGlyphs {
    fn default() -> Self {
        TreeGlyphs {
            indent: default_indent(),
            collapsed: default_collapsed(),
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of a treeview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeviewDefinition {
    /// Fields that partition the rows, outermost first.
    #[serde(default)]
    pub group_keys: Vec<String>,

    /// Rollups shown on group rows.
    #[serde(default)]
    pub aggregates: Vec<AggregateSpec>,

    /// Active sort chain; the first entry has the highest precedence.
    #[serde(default)]
    pub sorts: Vec<ColumnSort>,

    /// Whether group ordering uses a group's aggregate for the sorted
    /// column when one is configured (otherwise the group key is used).
    #[serde(default = "default_true")]
    pub sort_groups_by_aggregate: bool,

    /// Initial expansion state of every group.
    #[serde(default = "default_true")]
    pub default_expanded: bool,

    #[serde(default)]
    pub glyphs: TreeGlyphs,
}

fn default_true() -> bool {
    true
}

impl Default for TreeviewDefinition {
    fn default() -> Self {
        TreeviewDefinition {
            group_keys: Vec::new(),
            aggregates: Vec::new(),
            sorts: Vec::new(),
            sort_groups_by_aggregate: true,
            default_expanded: true,
            glyphs: TreeGlyphs::default(),
        }
    }
}

impl TreeviewDefinition {
    /// Creates a definition grouping by the given fields.
    pub fn new<I, K>(group_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        TreeviewDefinition {
            group_keys: group_keys.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_aggregate(mut self, field: impl Into<String>, aggregation: AggregationType) -> Self {
        self.aggregates.push(AggregateSpec::new(field, aggregation));
        self
    }

    pub fn with_sort(mut self, sort: ColumnSort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Parses a definition from JSON. Missing members take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

//! FILENAME: core/treeview-engine/src/sorter.rs
//! Sorting for the tree: chained column comparators and the group sorter
//! that applies them to group children and leaf rows.
//!
//! Every sort here is stable (`slice::sort_by`), and group sorts break
//! ties on build order explicitly.

use std::cmp::Ordering;

use datasource::{compare_values, DataSource, Value};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::definition::{ColumnSort, FieldIndex, SortDirection};
use crate::node::{GroupNode, LeafNode, Node};

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

// ============================================================================
// SORTER COMPOSITE
// ============================================================================

/// An ordered chain of column comparators. Comparator `i` is consulted
/// only when comparators `0..i` report equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SorterComposite {
    sorts: SmallVec<[ColumnSort; 4]>,
}

impl SorterComposite {
    pub fn new(sorts: impl IntoIterator<Item = ColumnSort>) -> Self {
        SorterComposite {
            sorts: sorts.into_iter().collect(),
        }
    }

    pub fn sorts(&self) -> &[ColumnSort] {
        &self.sorts
    }

    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }

    /// Runs the chain with a caller-supplied comparison per link.
    pub fn chain<F>(&self, mut compare: F) -> Ordering
    where
        F: FnMut(&ColumnSort) -> Ordering,
    {
        for sort in &self.sorts {
            let ordering = directed(compare(sort), sort.direction);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Compares two source rows.
    pub fn compare_rows<S: DataSource + ?Sized>(&self, source: &S, a: usize, b: usize) -> Ordering {
        self.chain(|sort| {
            let va = source.get_value(sort.column, a).unwrap_or(&Value::Empty);
            let vb = source.get_value(sort.column, b).unwrap_or(&Value::Empty);
            compare_values(va, vb)
        })
    }
}

// ============================================================================
// GROUP SORTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSorter {
    composite: SorterComposite,
    /// Whether a group's aggregate for the sorted column stands in for
    /// its key.
    use_aggregates: bool,
}

impl GroupSorter {
    pub fn new(sorts: impl IntoIterator<Item = ColumnSort>, use_aggregates: bool) -> Self {
        GroupSorter {
            composite: SorterComposite::new(sorts),
            use_aggregates,
        }
    }

    pub fn composite(&self) -> &SorterComposite {
        &self.composite
    }

    pub fn is_empty(&self) -> bool {
        self.composite.is_empty()
    }

    /// The value a group is ordered by for `column`.
    pub fn representative(&self, group: &GroupNode, column: FieldIndex) -> Value {
        if self.use_aggregates {
            if let Some(value) = group.aggregate(column) {
                return value.clone();
            }
        }
        group.key().to_value()
    }

    fn compare_groups(&self, a: &Node, b: &Node, column: FieldIndex) -> Ordering {
        match (a.as_group(), b.as_group()) {
            (Some(ga), Some(gb)) => compare_values(
                &self.representative(ga, column),
                &self.representative(gb, column),
            ),
            _ => Ordering::Equal,
        }
    }

    fn group_pass(&self, children: &mut [Node], column: FieldIndex, direction: SortDirection) {
        children.sort_by(|a, b| directed(self.compare_groups(a, b, column), direction));
    }

    /// Stable-sorts group children on one column. Ties keep build order.
    pub fn sort_groups(&self, children: &mut [Node], key_column: FieldIndex, direction: SortDirection) {
        children.sort_by_key(Node::ordinal);
        self.group_pass(children, key_column, direction);
    }

    /// Stable multi-key sort of leaf row positions.
    pub fn sort_leaves<S: DataSource + ?Sized>(&self, leaf_indexes: &mut [usize], source: &S) {
        if self.composite.is_empty() {
            return;
        }
        leaf_indexes.sort_by(|&a, &b| self.composite.compare_rows(source, a, b));
    }

    /// Sorts the children of one group with the whole chain. Group children
    /// go through `sort_groups` for the lowest-precedence comparator and
    /// then one stable pass per higher one; leaf children are reordered to
    /// follow `sort_leaves` over their rows.
    pub fn sort_children<S: DataSource + ?Sized>(&self, children: &mut [Node], source: &S) {
        if self.composite.is_empty() {
            return;
        }
        if children.iter().any(Node::has_children) {
            let mut sorts = self.composite.sorts().iter().rev();
            if let Some(last) = sorts.next() {
                self.sort_groups(children, last.column, last.direction);
                for sort in sorts {
                    self.group_pass(children, sort.column, sort.direction);
                }
            }
        } else {
            let mut rows: Vec<usize> = children
                .iter()
                .filter_map(|child| child.as_leaf().and_then(LeafNode::row))
                .collect();
            self.sort_leaves(&mut rows, source);
            let rank: FxHashMap<usize, usize> = rows.iter().enumerate().map(|(rank, &row)| (row, rank)).collect();
            children.sort_by_key(|child| {
                child
                    .as_leaf()
                    .and_then(LeafNode::row)
                    .and_then(|row| rank.get(&row).copied())
                    .unwrap_or(usize::MAX)
            });
        }
    }
}

//! FILENAME: core/treeview-engine/src/treeview.rs
//! Treeview - the orchestrator.
//!
//! Owns the source, the tree, the aggregator and the flattened view, and
//! answers the flat row/column contract over the visible rows:
//!
//! 1. Build: partition rows into the tree, roll up group aggregates,
//!    apply remembered expansion, compute heights, sort, flatten.
//! 2. Read: `view[row]` is the path of the node rendered at `row`.
//! 3. Expand/collapse: heights are refreshed along one path and only the
//!    toggled group's span of the view is replaced.
//!
//! A build always assembles the new tree, aggregator cache and view off to
//! the side and publishes them together, so a failed build leaves the
//! previous structure in place.

use datasource::{DataSource, Value};
use log::debug;
use rustc_hash::FxHashMap;

use crate::aggregator::Aggregator;
use crate::definition::{AggregationType, ColumnSort, FieldIndex, SortDirection, TreeviewDefinition};
use crate::error::{Result, TreeviewError};
use crate::key::GroupPath;
use crate::node::{DrillDown, Node, NodePath};
use crate::sorter::GroupSorter;
use crate::tree::Tree;

/// Everything one build produces, published as a unit.
struct Generation {
    tree: Tree,
    view: Vec<NodePath>,
    aggregator: Aggregator,
}

#[derive(Debug)]
pub struct Treeview<S> {
    source: S,
    definition: TreeviewDefinition,
    aggregator: Aggregator,
    tree: Tree,
    /// One entry per visible row.
    view: Vec<NodePath>,
    /// Expansion toggles by group, reapplied when the tree is rebuilt.
    expansion: FxHashMap<GroupPath, bool>,
}

impl<S: DataSource> Treeview<S> {
    /// Builds a treeview over `source`.
    pub fn build(source: S, definition: TreeviewDefinition) -> Result<Self> {
        Self::with_aggregator(source, definition, Aggregator::new())
    }

    /// Builds with an aggregator that already carries custom reducers.
    pub fn with_aggregator(source: S, definition: TreeviewDefinition, aggregator: Aggregator) -> Result<Self> {
        let mut treeview = Treeview {
            source,
            definition,
            aggregator,
            tree: Tree::empty(),
            view: Vec::new(),
            expansion: FxHashMap::default(),
        };
        treeview.rebuild()?;
        Ok(treeview)
    }

    // ========================================================================
    // BUILD
    // ========================================================================

    /// Full rebuild from the current source rows and definition. The
    /// source is refreshed first, so a filtered source re-applies its
    /// filters to edited rows.
    pub fn rebuild(&mut self) -> Result<()> {
        self.source.refresh()?;
        let generation = self.build_generation(&self.definition.group_keys, &self.expansion)?;
        self.publish(generation);
        Ok(())
    }

    fn build_generation(
        &self,
        group_keys: &[String],
        expansion: &FxHashMap<GroupPath, bool>,
    ) -> Result<Generation> {
        let aggregates = self.resolve_aggregates()?;
        self.validate_sorts(&self.definition.sorts)?;

        let rows: Vec<usize> = (0..self.source.get_row_count()).collect();
        let mut tree = Tree::build(&self.source, &rows, group_keys)?;

        let mut aggregator = self.aggregator.fresh();
        let source = &self.source;
        let default_expanded = self.definition.default_expanded;
        tree.try_for_each_group_mut(|group| {
            for (column, aggregation) in &aggregates {
                if let Some(value) = aggregator.aggregate(group, *column, aggregation, source)? {
                    group.set_aggregate(*column, value);
                }
            }
            let expanded = expansion.get(group.path()).copied().unwrap_or(default_expanded);
            group.set_expanded(expanded);
            Ok(())
        })?;
        tree.compute_height();

        let sorter = self.sorter();
        if !sorter.is_empty() {
            tree.sort_with(&sorter, source);
        }

        let view = tree.build_view();
        Ok(Generation {
            tree,
            view,
            aggregator,
        })
    }

    fn publish(&mut self, generation: Generation) {
        self.tree = generation.tree;
        self.view = generation.view;
        self.aggregator = generation.aggregator;
        debug!(
            "treeview built: {} source rows, {} groups, {} visible rows",
            self.source.get_row_count(),
            self.tree.group_count(),
            self.view.len()
        );
    }

    fn resolve_aggregates(&self) -> Result<Vec<(FieldIndex, AggregationType)>> {
        self.definition
            .aggregates
            .iter()
            .map(|spec| {
                let column = self.source.field_index(&spec.field).ok_or_else(|| {
                    TreeviewError::Configuration(format!("unknown aggregate field '{}'", spec.field))
                })?;
                self.aggregator.validate(&spec.aggregation)?;
                Ok((column, spec.aggregation.clone()))
            })
            .collect()
    }

    fn validate_sorts(&self, sorts: &[ColumnSort]) -> Result<()> {
        let count = self.source.get_column_count();
        match sorts.iter().find(|s| s.column >= count) {
            Some(sort) => Err(TreeviewError::Configuration(format!(
                "sort column {} out of range (column count {})",
                sort.column, count
            ))),
            None => Ok(()),
        }
    }

    fn sorter(&self) -> GroupSorter {
        GroupSorter::new(
            self.definition.sorts.iter().copied(),
            self.definition.sort_groups_by_aggregate,
        )
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Direct access to the source. Call `rebuild` after changing rows.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn definition(&self) -> &TreeviewDefinition {
        &self.definition
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Reducers registered here apply from the next build.
    pub fn aggregator_mut(&mut self) -> &mut Aggregator {
        &mut self.aggregator
    }

    /// Rendering context for the current tree.
    pub fn drill_down(&self) -> DrillDown<'_> {
        DrillDown::new(&self.source, self.tree.has_groups(), &self.definition.glyphs)
    }

    // ========================================================================
    // FLAT CONTRACT
    // ========================================================================

    pub fn get_row_count(&self) -> usize {
        self.view.len()
    }

    /// Source columns, plus the tree column while grouping.
    pub fn get_column_count(&self) -> usize {
        self.source.get_column_count() + usize::from(self.tree.has_groups())
    }

    /// Node rendered at a view row.
    pub fn node_at(&self, row: usize) -> Option<&Node> {
        self.view.get(row).and_then(|path| self.tree.node(path))
    }

    pub fn get_value(&self, column: usize, row: usize) -> Option<Value> {
        self.node_at(row)?.cell_value(&self.drill_down(), column)
    }

    pub fn get_row(&self, row: usize) -> Option<Vec<Value>> {
        let mut data = Vec::new();
        self.get_row_into(row, &mut data).then(|| data)
    }

    /// Renders a view row into a caller-owned buffer. Returns `false`
    /// (buffer untouched) when `row` is out of range.
    pub fn get_row_into(&self, row: usize, data: &mut Vec<Value>) -> bool {
        match self.node_at(row) {
            Some(node) => {
                node.get_row_data(&self.drill_down(), data);
                true
            }
            None => false,
        }
    }

    /// Writes a leaf cell through to the source and rebuilds. A filtered
    /// source drops the row from the view if it no longer matches.
    /// `column` is a view column.
    pub fn set_value(&mut self, column: usize, row: usize, value: Value) -> Result<()> {
        let count = self.get_row_count();
        let node = self.node_at(row).ok_or(TreeviewError::RowOutOfRange { row, count })?;
        let offset = usize::from(self.tree.has_groups());
        let source_row = match node {
            Node::Leaf(leaf) if column >= offset => leaf.row(),
            _ => None,
        }
        .ok_or(TreeviewError::NotASourceCell { column, row })?;

        self.source.set_value(column - offset, source_row, value)?;
        self.rebuild()
    }

    // ========================================================================
    // GROUPING
    // ========================================================================

    pub fn has_groups(&self) -> bool {
        self.tree.has_groups()
    }

    pub fn get_group_keys(&self) -> &[String] {
        &self.definition.group_keys
    }

    /// Regroups. Remembered expansion is discarded. On error the current
    /// grouping stays in effect.
    pub fn set_group_keys<I, K>(&mut self, group_keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let group_keys: Vec<String> = group_keys.into_iter().map(Into::into).collect();
        self.source.refresh()?;
        let generation = self.build_generation(&group_keys, &FxHashMap::default())?;
        self.definition.group_keys = group_keys;
        self.expansion.clear();
        self.publish(generation);
        Ok(())
    }

    // ========================================================================
    // EXPAND / COLLAPSE
    // ========================================================================

    fn locate(&self, group: &GroupPath) -> Result<NodePath> {
        self.tree
            .locate(group)
            .ok_or_else(|| TreeviewError::GroupNotFound(group.to_string()))
    }

    /// Flips a group's expansion and splices its span of the view.
    pub fn toggle_expand(&mut self, group: &GroupPath) -> Result<()> {
        let path = self.locate(group)?;
        // Captured before the heights change
        let offset = self.tree.view_offset(&path);

        let node = self
            .tree
            .group_mut(&path)
            .ok_or_else(|| TreeviewError::GroupNotFound(group.to_string()))?;
        let previous_height = node.height();
        let expanded = !node.is_expanded();
        node.set_expanded(expanded);

        self.tree.refresh_heights_along(&path);
        self.expansion.insert(group.clone(), expanded);

        // Nothing to splice when an ancestor is collapsed
        if let Some(start) = offset {
            let mut rows = Vec::new();
            if let Some(node) = self.tree.node(&path) {
                node.build_view(&mut path.clone(), &mut rows);
            }
            let inserted = rows.len();
            self.view.splice(start..start + previous_height, rows);
            debug!(
                "group {} {}: view rows {}..{} replaced by {} rows",
                group,
                if expanded { "expanded" } else { "collapsed" },
                start,
                start + previous_height,
                inserted
            );
        }
        debug_assert_eq!(self.view.len(), self.tree.height());
        Ok(())
    }

    /// Toggles the group rendered at a view row.
    pub fn toggle_expand_row(&mut self, row: usize) -> Result<()> {
        let count = self.get_row_count();
        let group = match self.node_at(row) {
            Some(Node::Group(group)) => group.path().clone(),
            Some(Node::Leaf(_)) => return Err(TreeviewError::NotAGroup(row)),
            None => return Err(TreeviewError::RowOutOfRange { row, count }),
        };
        self.toggle_expand(&group)
    }

    pub fn is_expanded(&self, group: &GroupPath) -> Result<bool> {
        let path = self.locate(group)?;
        self.tree
            .group(&path)
            .map(|g| g.is_expanded())
            .ok_or_else(|| TreeviewError::GroupNotFound(group.to_string()))
    }

    pub fn set_expanded(&mut self, group: &GroupPath, expanded: bool) -> Result<()> {
        if self.is_expanded(group)? != expanded {
            self.toggle_expand(group)?;
        }
        Ok(())
    }

    pub fn expand_all(&mut self) {
        self.set_all_expanded(true);
    }

    pub fn collapse_all(&mut self) {
        self.set_all_expanded(false);
    }

    fn set_all_expanded(&mut self, expanded: bool) {
        self.definition.default_expanded = expanded;
        self.expansion.clear();
        self.tree.for_each_group_mut(|g| g.set_expanded(expanded));
        self.tree.compute_height();
        self.view = self.tree.build_view();
    }

    // ========================================================================
    // SORTING
    // ========================================================================

    /// Resorts groups and leaves on one source column without regrouping.
    pub fn sort_by(&mut self, column: FieldIndex, direction: SortDirection) -> Result<()> {
        self.set_sorts(vec![ColumnSort::new(column, direction)])
    }

    /// Replaces the sort chain; the first entry has the highest precedence.
    pub fn set_sorts(&mut self, sorts: Vec<ColumnSort>) -> Result<()> {
        self.validate_sorts(&sorts)?;
        self.definition.sorts = sorts;
        if self.definition.sorts.is_empty() {
            self.tree.clear_group_sorts();
        } else {
            let sorter = self.sorter();
            self.tree.sort_with(&sorter, &self.source);
        }
        self.view = self.tree.build_view();
        Ok(())
    }

    /// Drops the sort chain and restores build order.
    pub fn clear_sorts(&mut self) {
        self.definition.sorts.clear();
        self.tree.clear_group_sorts();
        self.view = self.tree.build_view();
    }

    // ========================================================================
    // AGGREGATES
    // ========================================================================

    /// Rollup of `column` over a group's rows. The root path covers every
    /// participating row.
    pub fn aggregate(
        &mut self,
        group: &GroupPath,
        column: FieldIndex,
        aggregation: &AggregationType,
    ) -> Result<Option<Value>> {
        if group.is_empty() {
            return self
                .aggregator
                .compute(&self.tree.get_index(), column, aggregation, &self.source);
        }
        let path = self.locate(group)?;
        let node = self
            .tree
            .group(&path)
            .ok_or_else(|| TreeviewError::GroupNotFound(group.to_string()))?;
        self.aggregator.aggregate(node, column, aggregation, &self.source)
    }

    /// Each configured aggregate over every participating row.
    pub fn grand_totals(&self) -> Result<Vec<(FieldIndex, Option<Value>)>> {
        let rows = self.tree.get_index();
        self.resolve_aggregates()?
            .into_iter()
            .map(|(column, aggregation)| {
                let value = self.aggregator.compute(&rows, column, &aggregation, &self.source)?;
                Ok((column, value))
            })
            .collect()
    }
}

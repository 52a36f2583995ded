//! FILENAME: core/treeview-engine/src/node.rs
//! Tree nodes - the leaf and group items of the hierarchy.
//!
//! A `Node` is either a `Leaf` (one source row) or a `Group` (rows sharing
//! a grouping value). Both answer the same operation set; dispatch is a
//! `match` on the variant.
//!
//! Invariants kept by every operation here:
//! - a leaf's height is 1;
//! - an expanded group's height is the sum of its children's heights,
//!   a collapsed group's height is 1;
//! - a group's `index` is the concatenation of its children's indexes in
//!   current child order.

use datasource::{DataSource, Value};
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::definition::{FieldIndex, TreeGlyphs};
use crate::key::{GroupPath, GroupValue};
use crate::sorter::GroupSorter;

/// Child positions from the top level down to a node.
pub type NodePath = SmallVec<[usize; 4]>;

// ============================================================================
// DRILL-DOWN CONTEXT
// ============================================================================

/// Read-only context threaded through view building and row rendering.
#[derive(Clone, Copy)]
pub struct DrillDown<'a> {
    source: &'a dyn DataSource,
    has_groups: bool,
    glyphs: &'a TreeGlyphs,
}

impl<'a> DrillDown<'a> {
    pub fn new(source: &'a dyn DataSource, has_groups: bool, glyphs: &'a TreeGlyphs) -> Self {
        DrillDown {
            source,
            has_groups,
            glyphs,
        }
    }

    pub fn has_groups(&self) -> bool {
        self.has_groups
    }

    /// Number of source columns.
    pub fn get_column_count(&self) -> usize {
        self.source.get_column_count()
    }

    /// Number of view columns: the tree column (when grouping) plus the
    /// source columns.
    pub fn view_column_count(&self) -> usize {
        self.get_column_count() + self.offset()
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.source
    }

    pub fn glyphs(&self) -> &'a TreeGlyphs {
        self.glyphs
    }

    fn offset(&self) -> usize {
        usize::from(self.has_groups)
    }
}

// ============================================================================
// LEAF
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    /// The source row; empty for a leaf that was never attached to one.
    index: SmallVec<[usize; 1]>,
    depth: usize,
    /// Position among its siblings at build time.
    ordinal: usize,
}

impl LeafNode {
    pub fn new(row: usize, ordinal: usize) -> Self {
        LeafNode {
            index: smallvec![row],
            depth: 0,
            ordinal,
        }
    }

    /// A leaf not bound to any source row.
    pub fn unbuilt() -> Self {
        LeafNode {
            index: SmallVec::new(),
            depth: 0,
            ordinal: 0,
        }
    }

    pub fn row(&self) -> Option<usize> {
        self.index.first().copied()
    }

    pub fn get_index(&self) -> &[usize] {
        &self.index
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ============================================================================
// GROUP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    key: GroupValue,
    path: GroupPath,
    /// The source column this level partitions on.
    column: FieldIndex,
    depth: usize,
    height: usize,
    expanded: bool,
    children: Vec<Node>,
    index: Vec<usize>,
    /// Rollups for the configured columns. Only present when defined.
    aggregates: FxHashMap<FieldIndex, Value>,
    ordinal: usize,
    /// Whether `children` is in a sorted order rather than build order.
    sorted: bool,
}

impl GroupNode {
    pub fn new(path: GroupPath, column: FieldIndex, ordinal: usize) -> Self {
        let key = path.keys().last().cloned().unwrap_or(GroupValue::Empty);
        GroupNode {
            key,
            path,
            column,
            depth: 0,
            height: 0,
            expanded: true,
            children: Vec::new(),
            index: Vec::new(),
            aggregates: FxHashMap::default(),
            ordinal,
            sorted: false,
        }
    }

    pub fn key(&self) -> &GroupValue {
        &self.key
    }

    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    pub fn column(&self) -> FieldIndex {
        self.column
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Sets the flag only; call `refresh_height` (and refresh ancestors)
    /// afterwards.
    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Replaces the children; the index follows, cached rollups are dropped.
    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = children;
        self.aggregates.clear();
        self.refresh_index();
    }

    pub fn get_index(&self) -> &[usize] {
        &self.index
    }

    /// Overrides the row index directly (detached groups only).
    pub fn set_index(&mut self, index: Vec<usize>) {
        self.index = index;
    }

    pub fn aggregates(&self) -> &FxHashMap<FieldIndex, Value> {
        &self.aggregates
    }

    pub fn aggregate(&self, column: FieldIndex) -> Option<&Value> {
        self.aggregates.get(&column)
    }

    pub fn set_aggregate(&mut self, column: FieldIndex, value: Value) {
        self.aggregates.insert(column, value);
    }

    /// Rebuilds `index` from the children in their current order.
    pub fn refresh_index(&mut self) {
        let total = self.children.iter().map(|c| c.get_index().len()).sum();
        let mut index = Vec::with_capacity(total);
        for child in &self.children {
            index.extend_from_slice(child.get_index());
        }
        self.index = index;
    }

    /// Recomputes this group's height from its children's cached heights.
    pub fn refresh_height(&mut self) -> usize {
        self.height = if self.expanded {
            self.children.iter().map(Node::height).sum()
        } else {
            1
        };
        self.height
    }

    /// Row label without indentation.
    pub fn label(&self) -> String {
        self.key.label()
    }
}

// ============================================================================
// NODE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Group(GroupNode),
}

impl Node {
    pub fn has_children(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.depth,
            Node::Group(group) => group.depth,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Group(group) => group.height,
        }
    }

    pub fn ordinal(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.ordinal,
            Node::Group(group) => group.ordinal,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupNode> {
        match self {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Group(_) => None,
        }
    }

    /// Source row positions covered by this node's subtree.
    pub fn get_index(&self) -> &[usize] {
        match self {
            Node::Leaf(leaf) => &leaf.index,
            Node::Group(group) => &group.index,
        }
    }

    /// Assigns `depth` to this node and `depth + 1` onward to its subtree.
    pub fn assign_depth(&mut self, depth: usize) {
        match self {
            Node::Leaf(leaf) => leaf.depth = depth,
            Node::Group(group) => {
                group.depth = depth;
                for child in &mut group.children {
                    child.assign_depth(depth + 1);
                }
            }
        }
    }

    /// Rendered tree-column label: indentation, then the collapsed glyph
    /// and key for groups.
    pub fn label(&self, glyphs: &TreeGlyphs) -> String {
        let indent = glyphs.indent.repeat(self.depth());
        match self {
            Node::Leaf(_) => indent,
            Node::Group(group) if group.expanded => format!("{}{}", indent, group.label()),
            Node::Group(group) => format!("{}{}{}", indent, glyphs.collapsed, group.label()),
        }
    }

    /// Appends the visible rows of this subtree to `view`.
    /// A leaf or a collapsed group is one row; an expanded group
    /// contributes its children's rows only.
    pub fn build_view(&self, path: &mut NodePath, view: &mut Vec<NodePath>) {
        match self {
            Node::Leaf(_) => view.push(path.clone()),
            Node::Group(group) if !group.expanded => view.push(path.clone()),
            Node::Group(group) => {
                for (i, child) in group.children.iter().enumerate() {
                    path.push(i);
                    child.build_view(path, view);
                    path.pop();
                }
            }
        }
    }

    /// Writes this node's row into `data`, sized to the view column count.
    ///
    /// Leaf: the tree column (when grouping) followed by the source values.
    /// Group: the label followed by the group's rollups (Empty where no
    /// rollup is configured). A leaf with no source row leaves `data`
    /// untouched.
    pub fn get_row_data(&self, drill_down: &DrillDown<'_>, data: &mut Vec<Value>) {
        let offset = drill_down.offset();
        let column_count = drill_down.get_column_count();

        match self {
            Node::Leaf(leaf) => {
                let row = match leaf.row() {
                    Some(row) => row,
                    None => return,
                };
                data.resize(column_count + offset, Value::Empty);
                if drill_down.has_groups() {
                    data[0] = Value::Text(self.label(drill_down.glyphs()));
                }
                let source = drill_down.source();
                for i in 0..column_count {
                    data[offset + i] = source.get_value(i, row).cloned().unwrap_or(Value::Empty);
                }
            }
            Node::Group(group) => {
                data.resize(column_count + offset, Value::Empty);
                data[0] = Value::Text(self.label(drill_down.glyphs()));
                for i in 0..column_count {
                    data[offset + i] = group.aggregates.get(&i).cloned().unwrap_or(Value::Empty);
                }
            }
        }
    }

    /// Single cell of this node's row; `None` past the last view column
    /// or for a leaf with no source row.
    pub fn cell_value(&self, drill_down: &DrillDown<'_>, column: usize) -> Option<Value> {
        let offset = drill_down.offset();
        if column >= drill_down.get_column_count() + offset {
            return None;
        }

        match self {
            Node::Leaf(leaf) => {
                let row = leaf.row()?;
                if column < offset {
                    return Some(Value::Text(self.label(drill_down.glyphs())));
                }
                Some(
                    drill_down
                        .source()
                        .get_value(column - offset, row)
                        .cloned()
                        .unwrap_or(Value::Empty),
                )
            }
            Node::Group(group) => {
                if column == 0 {
                    return Some(Value::Text(self.label(drill_down.glyphs())));
                }
                Some(group.aggregates.get(&(column - offset)).cloned().unwrap_or(Value::Empty))
            }
        }
    }

    /// Recomputes and caches heights bottom-up; returns this node's height.
    pub fn compute_height(&mut self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Group(group) => {
                for child in &mut group.children {
                    child.compute_height();
                }
                group.refresh_height()
            }
        }
    }

    /// Reorders the subtree with `sorter`. Leaves have nothing to sort.
    /// Group indexes follow the new order; rollups are untouched.
    pub fn sort_with(&mut self, sorter: &GroupSorter, source: &dyn DataSource) {
        if let Node::Group(group) = self {
            for child in &mut group.children {
                child.sort_with(sorter, source);
            }
            sorter.sort_children(&mut group.children, source);
            group.refresh_index();
            group.sorted = true;
        }
    }

    /// Restores build order throughout the subtree.
    pub fn clear_group_sorts(&mut self) {
        if let Node::Group(group) = self {
            for child in &mut group.children {
                child.clear_group_sorts();
            }
            if group.sorted {
                group.children.sort_by_key(Node::ordinal);
                group.refresh_index();
                group.sorted = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasource::{Row, RowStore};

    fn store() -> RowStore {
        RowStore::new(
            vec![
                Row::new(vec![Value::from("A"), Value::from(1.0)]),
                Row::new(vec![Value::from("A"), Value::from(3.0)]),
                Row::new(vec![Value::from("B"), Value::from(5.0)]),
            ],
            vec!["g".to_string(), "v".to_string()],
        )
    }

    fn group_a() -> Node {
        let mut group = GroupNode::new(GroupPath::root().child("A".into()), 0, 0);
        group.set_children(vec![Node::Leaf(LeafNode::new(0, 0)), Node::Leaf(LeafNode::new(1, 1))]);
        let mut node = Node::Group(group);
        node.assign_depth(0);
        node.compute_height();
        node
    }

    #[test]
    fn test_leaf_invariants() {
        let mut leaf = Node::Leaf(LeafNode::new(7, 0));
        assert_eq!(leaf.compute_height(), 1);
        assert_eq!(leaf.get_index(), &[7]);
        assert!(!leaf.has_children());
    }

    #[test]
    fn test_group_height_and_index() {
        let mut node = group_a();
        assert_eq!(node.height(), 2);
        assert_eq!(node.get_index(), &[0, 1]);
        assert_eq!(node.as_group().unwrap().children()[1].depth(), 1);

        node.as_group_mut().unwrap().set_expanded(false);
        assert_eq!(node.compute_height(), 1);
    }

    #[test]
    fn test_empty_group_height_is_zero_when_expanded() {
        let mut node = Node::Group(GroupNode::new(GroupPath::root().child("E".into()), 0, 0));
        assert_eq!(node.compute_height(), 0);
        assert!(node.get_index().is_empty());
        let mut view = Vec::new();
        node.build_view(&mut NodePath::new(), &mut view);
        assert!(view.is_empty());
    }

    #[test]
    fn test_build_view_collapsed_group_is_one_row() {
        let mut node = group_a();
        let mut view = Vec::new();
        node.build_view(&mut NodePath::new(), &mut view);
        assert_eq!(view, vec![NodePath::from_slice(&[0]), NodePath::from_slice(&[1])]);

        node.as_group_mut().unwrap().set_expanded(false);
        node.compute_height();
        view.clear();
        node.build_view(&mut NodePath::new(), &mut view);
        assert_eq!(view, vec![NodePath::new()]);
    }

    #[test]
    fn test_leaf_row_data_with_groups() {
        let s = store();
        let glyphs = TreeGlyphs::default();
        let ctx = DrillDown::new(&s, true, &glyphs);
        let node = group_a();
        let leaf = &node.as_group().unwrap().children()[1];

        let mut data = Vec::new();
        leaf.get_row_data(&ctx, &mut data);
        assert_eq!(
            data,
            vec![Value::text(glyphs.indent.clone()), Value::from("A"), Value::from(3.0)]
        );
        assert_eq!(leaf.cell_value(&ctx, 2), Some(Value::from(3.0)));
        assert_eq!(leaf.cell_value(&ctx, 3), None);
    }

    #[test]
    fn test_unbuilt_leaf_leaves_buffer_untouched() {
        let s = store();
        let glyphs = TreeGlyphs::default();
        let ctx = DrillDown::new(&s, false, &glyphs);
        let leaf = Node::Leaf(LeafNode::unbuilt());
        let mut data = vec![Value::from("keep")];
        leaf.get_row_data(&ctx, &mut data);
        assert_eq!(data, vec![Value::from("keep")]);
        assert_eq!(leaf.cell_value(&ctx, 0), None);
    }

    #[test]
    fn test_group_row_data_uses_aggregates() {
        let s = store();
        let glyphs = TreeGlyphs::default();
        let ctx = DrillDown::new(&s, true, &glyphs);
        let mut node = group_a();
        {
            let group = node.as_group_mut().unwrap();
            group.set_aggregate(1, Value::from(4.0));
            group.set_expanded(false);
        }
        node.compute_height();

        let mut data = Vec::new();
        node.get_row_data(&ctx, &mut data);
        assert_eq!(
            data,
            vec![Value::text(format!("{}A", glyphs.collapsed)), Value::Empty, Value::from(4.0)]
        );
    }

    #[test]
    fn test_clear_group_sorts_restores_build_order() {
        let s = store();
        let mut node = group_a();
        let sorter = GroupSorter::new(
            [crate::definition::ColumnSort::descending(1)],
            true,
        );
        node.sort_with(&sorter, &s);
        assert_eq!(node.get_index(), &[1, 0]);
        assert!(node.as_group().unwrap().is_sorted());

        node.clear_group_sorts();
        assert_eq!(node.get_index(), &[0, 1]);
        assert!(!node.as_group().unwrap().is_sorted());
    }
}

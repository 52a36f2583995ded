//! FILENAME: core/treeview-engine/src/tree.rs
//! Tree - partitions flat rows into group and leaf nodes.
//!
//! Each level buckets its parent's rows by the value of the next grouping
//! column, in order of first occurrence. When the key list is exhausted the
//! remaining rows become leaves.

use datasource::{DataSource, Value};
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::definition::FieldIndex;
use crate::error::{Result, TreeviewError};
use crate::key::{GroupPath, GroupValue};
use crate::node::{GroupNode, LeafNode, Node, NodePath};
use crate::sorter::GroupSorter;

/// Maps grouping field names to source column positions.
pub fn resolve_group_keys<S: DataSource + ?Sized>(source: &S, group_keys: &[String]) -> Result<Vec<FieldIndex>> {
    group_keys
        .iter()
        .map(|key| {
            source.field_index(key).ok_or_else(|| {
                warn!("treeview build rejected: unknown group key '{}'", key);
                TreeviewError::Configuration(format!("unknown group key '{}'", key))
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    roots: Vec<Node>,
    group_columns: Vec<FieldIndex>,
    height: usize,
}

impl Tree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the node graph over `rows` (source positions).
    /// Every key is resolved before any node is created.
    pub fn build<S: DataSource + ?Sized>(source: &S, rows: &[usize], group_keys: &[String]) -> Result<Self> {
        let group_columns = resolve_group_keys(source, group_keys)?;

        let mut roots = partition(source, rows, &group_columns, &GroupPath::root());
        for root in &mut roots {
            root.assign_depth(0);
        }

        let mut tree = Tree {
            roots,
            group_columns,
            height: 0,
        };
        tree.compute_height();

        debug!(
            "tree built: {} rows, {} top-level nodes, {} grouping levels",
            rows.len(),
            tree.roots.len(),
            tree.group_columns.len()
        );
        Ok(tree)
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    pub fn group_columns(&self) -> &[FieldIndex] {
        &self.group_columns
    }

    pub fn has_groups(&self) -> bool {
        !self.group_columns.is_empty()
    }

    /// Visible rows: the sum of top-level heights.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Every participating source row, in current order.
    pub fn get_index(&self) -> Vec<usize> {
        self.roots.iter().flat_map(|n| n.get_index().iter().copied()).collect()
    }

    pub fn compute_height(&mut self) -> usize {
        self.height = self.roots.iter_mut().map(Node::compute_height).sum();
        self.height
    }

    /// Flattens the visible rows, one path per row.
    pub fn build_view(&self) -> Vec<NodePath> {
        let mut view = Vec::with_capacity(self.height);
        let mut path = NodePath::new();
        for (i, root) in self.roots.iter().enumerate() {
            path.push(i);
            root.build_view(&mut path, &mut view);
            path.pop();
        }
        view
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for &i in rest {
            node = node.as_group()?.children().get(i)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for &i in rest {
            node = node.as_group_mut()?.children_mut().get_mut(i)?;
        }
        Some(node)
    }

    pub fn group(&self, path: &[usize]) -> Option<&GroupNode> {
        self.node(path)?.as_group()
    }

    pub fn group_mut(&mut self, path: &[usize]) -> Option<&mut GroupNode> {
        self.node_mut(path)?.as_group_mut()
    }

    /// Child positions of the group addressed by key values.
    pub fn locate(&self, group: &GroupPath) -> Option<NodePath> {
        if group.is_empty() {
            return None;
        }
        let mut path = NodePath::new();
        let mut nodes = self.roots.as_slice();
        for key in group.keys() {
            let position = nodes
                .iter()
                .position(|n| n.as_group().map_or(false, |g| g.key() == key))?;
            path.push(position);
            nodes = nodes[position].as_group()?.children();
        }
        Some(path)
    }

    /// First view row of the node at `path`, or `None` when an ancestor is
    /// collapsed (the node is not in the view).
    pub fn view_offset(&self, path: &[usize]) -> Option<usize> {
        let mut offset = 0;
        let mut nodes = self.roots.as_slice();
        for (level, &i) in path.iter().enumerate() {
            let node = nodes.get(i)?;
            offset += nodes[..i].iter().map(Node::height).sum::<usize>();
            if level + 1 < path.len() {
                match node {
                    Node::Group(g) if g.is_expanded() => nodes = g.children(),
                    _ => return None,
                }
            }
        }
        Some(offset)
    }

    /// Re-derives cached heights of the node at `path` and its ancestors,
    /// then the tree total.
    pub fn refresh_heights_along(&mut self, path: &[usize]) {
        fn refresh(nodes: &mut [Node], path: &[usize]) {
            if let Some((&first, rest)) = path.split_first() {
                if let Some(Node::Group(group)) = nodes.get_mut(first) {
                    refresh(group.children_mut(), rest);
                    group.refresh_height();
                }
            }
        }
        refresh(&mut self.roots, path);
        self.height = self.roots.iter().map(Node::height).sum();
    }

    /// Applies `f` to every group, depth first.
    pub fn for_each_group_mut<F: FnMut(&mut GroupNode)>(&mut self, mut f: F) {
        fn walk<F: FnMut(&mut GroupNode)>(nodes: &mut [Node], f: &mut F) {
            for node in nodes {
                if let Node::Group(group) = node {
                    f(group);
                    walk(group.children_mut(), f);
                }
            }
        }
        walk(&mut self.roots, &mut f);
    }

    /// Fallible form of `for_each_group_mut`; stops at the first error.
    pub fn try_for_each_group_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut GroupNode) -> Result<()>,
    {
        fn walk<F>(nodes: &mut [Node], f: &mut F) -> Result<()>
        where
            F: FnMut(&mut GroupNode) -> Result<()>,
        {
            for node in nodes {
                if let Node::Group(group) = node {
                    f(group)?;
                    walk(group.children_mut(), f)?;
                }
            }
            Ok(())
        }
        walk(&mut self.roots, &mut f)
    }

    pub fn group_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .filter_map(Node::as_group)
                .map(|g| 1 + count(g.children()))
                .sum()
        }
        count(&self.roots)
    }

    /// Reorders every level with `sorter`; membership is unchanged.
    pub fn sort_with<S: DataSource>(&mut self, sorter: &GroupSorter, source: &S) {
        for root in &mut self.roots {
            root.sort_with(sorter, source);
        }
        sorter.sort_children(&mut self.roots, source);
        debug!("tree sorted by {:?}", sorter.composite().sorts());
    }

    /// Back to build order everywhere.
    pub fn clear_group_sorts(&mut self) {
        for root in &mut self.roots {
            root.clear_group_sorts();
        }
        self.roots.sort_by_key(Node::ordinal);
    }
}

/// Splits `rows` on `columns[0]` and recurses with the remaining columns.
fn partition<S: DataSource + ?Sized>(
    source: &S,
    rows: &[usize],
    columns: &[FieldIndex],
    parent: &GroupPath,
) -> Vec<Node> {
    let (&column, rest) = match columns.split_first() {
        Some(split) => split,
        None => {
            return rows
                .iter()
                .enumerate()
                .map(|(ordinal, &row)| Node::Leaf(LeafNode::new(row, ordinal)))
                .collect()
        }
    };

    // Buckets in order of first occurrence
    let mut positions: FxHashMap<GroupValue, usize> = FxHashMap::default();
    let mut buckets: Vec<(GroupValue, Vec<usize>)> = Vec::new();
    for &row in rows {
        let key = GroupValue::from(source.get_value(column, row).unwrap_or(&Value::Empty));
        match positions.get(&key) {
            Some(&i) => buckets[i].1.push(row),
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push((key, vec![row]));
            }
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(ordinal, (key, members))| {
            let path = parent.child(key);
            let children = partition(source, &members, rest, &path);
            let mut group = GroupNode::new(path, column, ordinal);
            group.set_children(children);
            Node::Group(group)
        })
        .collect()
}

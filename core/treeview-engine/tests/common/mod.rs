//! FILENAME: tests/common/mod.rs
//! Fixtures and assertion helpers for treeview engine integration tests.

#![allow(dead_code)]

use datasource::{Row, RowStore, Value};
use treeview_engine::{GroupPath, Node, Tree, Treeview, TreeviewDefinition};

// ============================================================================
// FIXTURES
// ============================================================================

/// The three-row store used by the grouping scenarios:
/// `[{g:'A',v:1},{g:'A',v:3},{g:'B',v:5}]`.
pub fn simple_store() -> RowStore {
    RowStore::new(
        vec![
            Row::new(vec![Value::from("A"), Value::from(1.0)]),
            Row::new(vec![Value::from("A"), Value::from(3.0)]),
            Row::new(vec![Value::from("B"), Value::from(5.0)]),
        ],
        vec!["g".to_string(), "v".to_string()],
    )
}

pub struct SalesFixture;

impl SalesFixture {
    pub const REGION: usize = 0;
    pub const PRODUCT: usize = 1;
    pub const QUARTER: usize = 2;
    pub const SALES: usize = 3;
    pub const QUANTITY: usize = 4;

    pub fn fields() -> Vec<String> {
        ["region", "product", "quarter", "sales", "quantity"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    pub fn store() -> RowStore {
        let rows = Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                Row::new(vec![
                    Value::from(region),
                    Value::from(product),
                    Value::from(quarter),
                    Value::from(sales),
                    Value::from(quantity),
                ])
            })
            .collect();
        RowStore::new(rows, Self::fields())
    }
}

pub fn path(keys: &[&str]) -> GroupPath {
    keys.iter().copied().collect()
}

// ============================================================================
// INSPECTION HELPERS
// ============================================================================

/// Column 0 of every view row with indentation and glyphs stripped.
pub fn view_labels<S: datasource::DataSource>(treeview: &Treeview<S>) -> Vec<String> {
    let glyphs = &treeview.definition().glyphs;
    (0..treeview.get_row_count())
        .map(|row| match treeview.get_value(0, row) {
            Some(Value::Text(text)) => text
                .trim_start_matches(glyphs.indent.as_str())
                .trim_start_matches(glyphs.collapsed.as_str())
                .to_string(),
            other => panic!("row {} has no label: {:?}", row, other),
        })
        .collect()
}

/// Source rows of the leaves in view order (groups excluded).
pub fn visible_leaf_rows<S: datasource::DataSource>(treeview: &Treeview<S>) -> Vec<usize> {
    (0..treeview.get_row_count())
        .filter_map(|row| treeview.node_at(row).and_then(Node::as_leaf).and_then(|l| l.row()))
        .collect()
}

/// Every group path in the tree, depth first.
pub fn group_paths(tree: &Tree) -> Vec<GroupPath> {
    fn walk(nodes: &[Node], out: &mut Vec<GroupPath>) {
        for node in nodes {
            if let Some(group) = node.as_group() {
                out.push(group.path().clone());
                walk(group.children(), out);
            }
        }
    }
    let mut out = Vec::new();
    walk(tree.roots(), &mut out);
    out
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Checks the height, index and depth invariants over a subtree.
pub fn assert_node_invariants(node: &Node, depth: usize) {
    assert_eq!(node.depth(), depth);
    match node {
        Node::Leaf(leaf) => {
            assert_eq!(node.height(), 1);
            assert_eq!(leaf.get_index().len(), 1);
        }
        Node::Group(group) => {
            let expected_height = if group.is_expanded() {
                group.children().iter().map(Node::height).sum()
            } else {
                1
            };
            assert_eq!(group.height(), expected_height, "height of {}", group.path());

            let concatenated: Vec<usize> = group
                .children()
                .iter()
                .flat_map(|c| c.get_index().iter().copied())
                .collect();
            assert_eq!(group.get_index(), concatenated.as_slice(), "index of {}", group.path());

            for child in group.children() {
                assert_node_invariants(child, depth + 1);
            }
        }
    }
}

pub fn assert_tree_invariants(tree: &Tree) {
    for root in tree.roots() {
        assert_node_invariants(root, 0);
    }
    assert_eq!(tree.height(), tree.roots().iter().map(Node::height).sum::<usize>());
}

pub fn assert_number(value: Option<Value>, expected: f64) {
    match value {
        Some(Value::Number(n)) => assert!((n - expected).abs() < 1e-9, "expected {}, got {}", expected, n),
        other => panic!("expected number {}, got {:?}", expected, other),
    }
}

pub fn build(store: RowStore, definition: TreeviewDefinition) -> Treeview<RowStore> {
    Treeview::build(store, definition).expect("treeview builds")
}

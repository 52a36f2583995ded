//! FILENAME: core/treeview-engine/src/filter.rs
//! TreeviewFilter - a treeview whose rows are narrowed by a row filter
//! before grouping.
//!
//! Leaf indexes refer to positions in the filtered source. Any filter
//! change rebuilds the tree; with no filter installed the filter is a
//! pass-through and the treeview sees every row.

use datasource::{DataFilter, DataSource, RowFilter, Value};
use log::debug;

use crate::aggregator::Aggregator;
use crate::definition::TreeviewDefinition;
use crate::error::Result;
use crate::treeview::Treeview;

#[derive(Debug)]
pub struct TreeviewFilter<S: DataSource> {
    treeview: Treeview<DataFilter<S>>,
}

impl<S: DataSource> TreeviewFilter<S> {
    pub fn build(source: S, definition: TreeviewDefinition) -> Result<Self> {
        Ok(TreeviewFilter {
            treeview: Treeview::build(DataFilter::new(source), definition)?,
        })
    }

    pub fn with_aggregator(source: S, definition: TreeviewDefinition, aggregator: Aggregator) -> Result<Self> {
        Ok(TreeviewFilter {
            treeview: Treeview::with_aggregator(DataFilter::new(source), definition, aggregator)?,
        })
    }

    pub fn treeview(&self) -> &Treeview<DataFilter<S>> {
        &self.treeview
    }

    /// Grouping, sorting and expansion go through the inner treeview.
    pub fn treeview_mut(&mut self) -> &mut Treeview<DataFilter<S>> {
        &mut self.treeview
    }

    pub fn into_inner(self) -> S {
        self.treeview.into_source().into_inner()
    }

    pub fn has_filters(&self) -> bool {
        self.treeview.source().has_filters()
    }

    /// Installs a filter and rebuilds. If either step fails the filter is
    /// not installed and the current tree stays.
    pub fn add_filter(&mut self, filter: RowFilter) -> Result<()> {
        self.treeview.source_mut().add_filter(filter)?;
        if let Err(err) = self.treeview.rebuild() {
            self.treeview.source_mut().pop_filter()?;
            return Err(err);
        }
        debug!(
            "treeview filter applied: {} of {} rows participate",
            self.treeview.source().get_row_count(),
            self.treeview.source().inner().get_row_count()
        );
        Ok(())
    }

    /// Drops every filter and rebuilds over all rows.
    pub fn clear_filters(&mut self) -> Result<()> {
        let previous = self.treeview.source_mut().set_filters(Vec::new())?;
        if let Err(err) = self.treeview.rebuild() {
            self.treeview.source_mut().set_filters(previous)?;
            return Err(err);
        }
        Ok(())
    }

    /// Writes a leaf cell and rebuilds with the filters re-applied, so a
    /// row edited out of the narrowing leaves the view.
    pub fn set_value(&mut self, column: usize, row: usize, value: Value) -> Result<()> {
        self.treeview.set_value(column, row, value)
    }

    pub fn get_row_count(&self) -> usize {
        self.treeview.get_row_count()
    }

    pub fn get_column_count(&self) -> usize {
        self.treeview.get_column_count()
    }

    pub fn get_value(&self, column: usize, row: usize) -> Option<Value> {
        self.treeview.get_value(column, row)
    }

    pub fn get_row(&self, row: usize) -> Option<Vec<Value>> {
        self.treeview.get_row(row)
    }

    pub fn get_row_into(&self, row: usize, data: &mut Vec<Value>) -> bool {
        self.treeview.get_row_into(row, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AggregationType;
    use crate::error::TreeviewError;
    use crate::key::GroupPath;
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

    #[test]
    fn test_pass_through_then_narrowed() {
        let mut tf = TreeviewFilter::build(
            store(),
            TreeviewDefinition::new(["g"]).with_aggregate("v", AggregationType::Sum),
        )
        .unwrap();
        assert!(!tf.has_filters());
        assert_eq!(tf.get_row_count(), 3);

        tf.add_filter(RowFilter::matching(1, |v, _, _| v.as_number().unwrap_or(0.0) > 2.0))
            .unwrap();
        assert_eq!(tf.get_row_count(), 2);
        let a: GroupPath = ["A"].into_iter().collect();
        assert_eq!(
            tf.treeview_mut().aggregate(&a, 1, &AggregationType::Sum).unwrap(),
            Some(Value::from(3.0))
        );

        tf.clear_filters().unwrap();
        assert_eq!(tf.get_row_count(), 3);
    }

    #[test]
    fn test_edit_out_of_filter_leaves_the_view() {
        let mut tf = TreeviewFilter::build(
            store(),
            TreeviewDefinition::new(["g"]).with_aggregate("v", AggregationType::Sum),
        )
        .unwrap();
        tf.add_filter(RowFilter::matching(1, |v, _, _| v.as_number().unwrap_or(0.0) > 2.0))
            .unwrap();
        assert_eq!(tf.get_row_count(), 2);

        // View row 0 is A's only remaining leaf; column 2 is `v`
        tf.set_value(2, 0, Value::from(0.0)).unwrap();
        assert_eq!(tf.get_row_count(), 1);
        assert_eq!(tf.get_value(2, 0), Some(Value::from(5.0)));
        assert!(tf.treeview().tree().locate(&["A"].into_iter().collect()).is_none());
        assert_eq!(tf.into_inner().get_value(1, 1), Some(&Value::from(0.0)));
    }

    fn strict_aggregator() -> Aggregator {
        let mut aggregator = Aggregator::new();
        aggregator.register_reducer("pair_only", |values: &[Value]| {
            if values.len() == 1 {
                Err("single row group".into())
            } else {
                Ok(None)
            }
        });
        aggregator
    }

    #[test]
    fn test_reducer_failure_rolls_back_filter() {
        let source = RowStore::new(
            vec![
                Row::new(vec![Value::from("A"), Value::from(1.0)]),
                Row::new(vec![Value::from("A"), Value::from(3.0)]),
            ],
            vec!["g".to_string(), "v".to_string()],
        );
        let definition = TreeviewDefinition::new(["g"])
            .with_aggregate("v", AggregationType::Custom("pair_only".into()));
        let mut tf = TreeviewFilter::with_aggregator(source, definition, strict_aggregator()).unwrap();

        // Narrowing to one row makes group A a single row group
        let err = tf
            .add_filter(RowFilter::matching(1, |v, _, _| v == &Value::from(1.0)))
            .unwrap_err();
        assert!(matches!(err, TreeviewError::Reducer(_)));
        assert!(!tf.has_filters());
        assert_eq!(tf.get_row_count(), 2);
    }

    #[test]
    fn test_build_surfaces_reducer_errors() {
        let definition = TreeviewDefinition::new(["g"])
            .with_aggregate("v", AggregationType::Custom("pair_only".into()));
        let err = TreeviewFilter::with_aggregator(store(), definition, strict_aggregator()).unwrap_err();
        assert_eq!(err.to_string(), "single row group");
    }
}

//! FILENAME: core/datasource/src/filter.rs
//! PURPOSE: Index-transposition row filter over any flat source.
//! CONTEXT: The filter keeps a narrowed list of source row positions and
//! answers the `DataSource` contract through it. With no filter installed
//! it is a pass-through.

use log::debug;

use crate::error::{BoxError, DataSourceError, Result};
use crate::source::DataSource;
use crate::value::{Row, Value};

/// Predicate signature: `(value at column_index, whole row, source row index)`.
pub type Predicate = Box<dyn Fn(&Value, &Row, usize) -> std::result::Result<bool, BoxError>>;

/// One filter: a predicate and the column whose value it receives.
pub struct RowFilter {
    pub column_index: usize,
    predicate: Predicate,
}

impl RowFilter {
    pub fn new<F>(column_index: usize, predicate: F) -> Self
    where
        F: Fn(&Value, &Row, usize) -> std::result::Result<bool, BoxError> + 'static,
    {
        RowFilter {
            column_index,
            predicate: Box::new(predicate),
        }
    }

    /// Infallible predicate convenience.
    pub fn matching<F>(column_index: usize, predicate: F) -> Self
    where
        F: Fn(&Value, &Row, usize) -> bool + 'static,
    {
        RowFilter::new(column_index, move |value, row, y| Ok(predicate(value, row, y)))
    }

    fn accepts(&self, value: &Value, row: &Row, y: usize) -> Result<bool> {
        (self.predicate)(value, row, y).map_err(DataSourceError::Predicate)
    }
}

impl std::fmt::Debug for RowFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowFilter")
            .field("column_index", &self.column_index)
            .finish_non_exhaustive()
    }
}

/// Narrows a flat source to the rows accepted by at least one filter.
#[derive(Debug)]
pub struct DataFilter<S> {
    data: S,

    /// Narrowed source positions. `None` while no filter is installed.
    indexes: Option<Vec<usize>>,

    filters: Vec<RowFilter>,
}

impl<S: DataSource> DataFilter<S> {
    pub fn new(data: S) -> Self {
        DataFilter {
            data,
            indexes: None,
            filters: Vec::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.data
    }

    /// Mutable access to the wrapped source. Call `apply_filters` after
    /// changing rows so the narrowed index follows.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.data
    }

    pub fn into_inner(self) -> S {
        self.data
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Narrowed source positions, or `None` when passing through.
    pub fn indexes(&self) -> Option<&[usize]> {
        self.indexes.as_deref()
    }

    /// Maps a filtered row position to the source position.
    pub fn transpose_y(&self, y: usize) -> Option<usize> {
        match &self.indexes {
            Some(indexes) => indexes.get(y).copied(),
            None => Some(y),
        }
    }

    /// Installs a filter and re-applies the whole filter list.
    /// On a predicate error the filter is not installed and the previous
    /// narrowing stays in effect.
    pub fn add_filter(&mut self, filter: RowFilter) -> Result<()> {
        self.filters.push(filter);
        match self.compute_indexes() {
            Ok(indexes) => {
                self.indexes = indexes;
                Ok(())
            }
            Err(err) => {
                self.filters.pop();
                Err(err)
            }
        }
    }

    /// Removes the most recently installed filter and re-applies the rest.
    pub fn pop_filter(&mut self) -> Result<Option<RowFilter>> {
        let popped = match self.filters.pop() {
            Some(filter) => filter,
            None => return Ok(None),
        };
        match self.compute_indexes() {
            Ok(indexes) => {
                self.indexes = indexes;
                Ok(Some(popped))
            }
            Err(err) => {
                self.filters.push(popped);
                Err(err)
            }
        }
    }

    /// Swaps in a whole filter list and returns the previous one.
    /// On a predicate error nothing changes.
    pub fn set_filters(&mut self, filters: Vec<RowFilter>) -> Result<Vec<RowFilter>> {
        let previous = std::mem::replace(&mut self.filters, filters);
        match self.compute_indexes() {
            Ok(indexes) => {
                self.indexes = indexes;
                Ok(previous)
            }
            Err(err) => {
                self.filters = previous;
                Err(err)
            }
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.indexes = None;
    }

    /// Recomputes the narrowed index from the current filter list.
    pub fn apply_filters(&mut self) -> Result<()> {
        self.indexes = self.compute_indexes()?;
        Ok(())
    }

    fn compute_indexes(&self) -> Result<Option<Vec<usize>>> {
        if self.filters.is_empty() {
            return Ok(None);
        }

        let count = self.data.get_row_count();
        let mut indexes = Vec::new();
        for y in 0..count {
            if self.apply_filters_to(y)? {
                indexes.push(y);
            }
        }

        debug!(
            "row filter kept {} of {} rows ({} filters)",
            indexes.len(),
            count,
            self.filters.len()
        );
        Ok(Some(indexes))
    }

    fn apply_filters_to(&self, y: usize) -> Result<bool> {
        let row = match self.data.get_row(y) {
            Some(row) => row,
            None => return Ok(false),
        };
        for filter in &self.filters {
            let value = row.get(filter.column_index).unwrap_or(&Value::Empty);
            if filter.accepts(value, row, y)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<S: DataSource> DataSource for DataFilter<S> {
    fn get_row(&self, y: usize) -> Option<&Row> {
        self.transpose_y(y).and_then(|sy| self.data.get_row(sy))
    }

    fn get_value(&self, x: usize, y: usize) -> Option<&Value> {
        self.transpose_y(y).and_then(|sy| self.data.get_value(x, sy))
    }

    fn set_value(&mut self, x: usize, y: usize, value: Value) -> Result<()> {
        let count = self.get_row_count();
        let sy = self
            .transpose_y(y)
            .ok_or(DataSourceError::RowOutOfRange { row: y, count })?;
        self.data.set_value(x, sy, value)
    }

    fn get_row_count(&self) -> usize {
        match &self.indexes {
            Some(indexes) => indexes.len(),
            None => self.data.get_row_count(),
        }
    }

    fn get_column_count(&self) -> usize {
        self.data.get_column_count()
    }

    fn get_fields(&self) -> &[String] {
        self.data.get_fields()
    }

    /// Refreshes the wrapped source, then re-applies the filter list so
    /// edited rows enter or leave the narrowing.
    fn refresh(&mut self) -> Result<()> {
        self.data.refresh()?;
        self.apply_filters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RowStore;

    fn store() -> RowStore {
        RowStore::new(
            (0..6)
                .map(|i| Row::new(vec![Value::from(i as f64), Value::from(if i % 2 == 0 { "even" } else { "odd" })]))
                .collect(),
            vec!["n".to_string(), "parity".to_string()],
        )
    }

    #[test]
    fn test_pass_through_without_filters() {
        let filter = DataFilter::new(store());
        assert_eq!(filter.get_row_count(), 6);
        assert_eq!(filter.transpose_y(4), Some(4));
        assert_eq!(filter.get_value(0, 5), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_filters_are_disjunctive() {
        let mut filter = DataFilter::new(store());
        filter
            .add_filter(RowFilter::matching(1, |v, _, _| v == &Value::from("even")))
            .unwrap();
        assert_eq!(filter.get_row_count(), 3);
        filter
            .add_filter(RowFilter::matching(0, |v, _, _| v.as_number() == Some(5.0)))
            .unwrap();
        assert_eq!(filter.indexes(), Some(&[0, 2, 4, 5][..]));
        assert_eq!(filter.get_value(0, 3), Some(&Value::Number(5.0)));
        assert_eq!(filter.get_value(0, 4), None);
    }

    #[test]
    fn test_filter_matching_nothing_yields_no_rows() {
        let mut filter = DataFilter::new(store());
        filter.add_filter(RowFilter::matching(0, |_, _, _| false)).unwrap();
        assert_eq!(filter.get_row_count(), 0);
        assert_eq!(filter.get_row(0), None);
    }

    #[test]
    fn test_predicate_error_propagates_and_keeps_previous_index() {
        let mut filter = DataFilter::new(store());
        filter
            .add_filter(RowFilter::matching(0, |v, _, _| v.as_number().unwrap_or(0.0) < 2.0))
            .unwrap();
        let err = filter
            .add_filter(RowFilter::new(0, |_, _, _| Err("predicate exploded".into())))
            .unwrap_err();
        assert_eq!(err.to_string(), "predicate exploded");
        assert_eq!(filter.get_row_count(), 2);
    }

    #[test]
    fn test_pop_and_set_filters() {
        let mut filter = DataFilter::new(store());
        filter.add_filter(RowFilter::matching(0, |_, _, y| y == 1)).unwrap();
        filter.add_filter(RowFilter::matching(0, |_, _, y| y == 3)).unwrap();
        assert_eq!(filter.get_row_count(), 2);

        assert!(filter.pop_filter().unwrap().is_some());
        assert_eq!(filter.indexes(), Some(&[1][..]));

        let previous = filter.set_filters(Vec::new()).unwrap();
        assert_eq!(previous.len(), 1);
        assert!(!filter.has_filters());
        assert_eq!(filter.get_row_count(), 6);

        let err = filter
            .set_filters(vec![RowFilter::new(0, |_, _, _| Err("bad".into()))])
            .unwrap_err();
        assert_eq!(err.to_string(), "bad");
        assert_eq!(filter.get_row_count(), 6);
        assert!(filter.pop_filter().unwrap().is_none());
    }

    #[test]
    fn test_set_value_writes_through_transposed_row() {
        let mut filter = DataFilter::new(store());
        filter.add_filter(RowFilter::matching(1, |v, _, _| v == &Value::from("odd"))).unwrap();
        filter.set_value(0, 0, Value::from(100.0)).unwrap();
        assert_eq!(filter.inner().get_value(0, 1), Some(&Value::Number(100.0)));
    }

    #[test]
    fn test_refresh_reapplies_filters_after_an_edit() {
        let mut filter = DataFilter::new(store());
        filter.add_filter(RowFilter::matching(1, |v, _, _| v == &Value::from("odd"))).unwrap();
        assert_eq!(filter.indexes(), Some(&[1, 3, 5][..]));

        filter.set_value(1, 1, Value::from("even")).unwrap();
        assert_eq!(filter.get_row_count(), 3);

        filter.refresh().unwrap();
        assert_eq!(filter.indexes(), Some(&[1, 5][..]));
        assert_eq!(filter.get_value(0, 0), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_refresh_without_filters_is_pass_through() {
        let mut filter = DataFilter::new(store());
        filter.refresh().unwrap();
        assert_eq!(filter.indexes(), None);
        assert_eq!(filter.get_row_count(), 6);
    }
}

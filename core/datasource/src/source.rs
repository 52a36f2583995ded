//! FILENAME: core/datasource/src/source.rs
//! PURPOSE: The flat-source contract shared by the row store, the row filter
//! and everything layered on top of them.

use crate::error::Result;
use crate::value::{Row, Value};

/// Row/column addressed access to a flat collection of rows.
/// Row and column are 0-based. Reads past the end return `None`.
pub trait DataSource {
    fn get_row(&self, y: usize) -> Option<&Row>;

    fn get_value(&self, x: usize, y: usize) -> Option<&Value> {
        self.get_row(y).and_then(|row| row.get(x))
    }

    fn set_value(&mut self, x: usize, y: usize, value: Value) -> Result<()>;

    fn get_row_count(&self) -> usize;

    fn get_column_count(&self) -> usize {
        self.get_fields().len()
    }

    fn get_fields(&self) -> &[String];

    /// Column index of a field name.
    fn field_index(&self, name: &str) -> Option<usize> {
        self.get_fields().iter().position(|f| f == name)
    }

    /// Brings derived state (such as a filtered index) back in line with
    /// the underlying rows. Called before every rebuild.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn get_row(&self, y: usize) -> Option<&Row> {
        (**self).get_row(y)
    }

    fn get_value(&self, x: usize, y: usize) -> Option<&Value> {
        (**self).get_value(x, y)
    }

    fn set_value(&mut self, x: usize, y: usize, value: Value) -> Result<()> {
        (**self).set_value(x, y, value)
    }

    fn get_row_count(&self) -> usize {
        (**self).get_row_count()
    }

    fn get_column_count(&self) -> usize {
        (**self).get_column_count()
    }

    fn get_fields(&self) -> &[String] {
        (**self).get_fields()
    }

    fn refresh(&mut self) -> Result<()> {
        (**self).refresh()
    }
}

//! FILENAME: core/datasource/src/store.rs
//! PURPOSE: Manages the flat collection of row records (the grid's data).
//! CONTEXT: This file defines the `RowStore` struct which acts as the container
//! for all row data. Rows are positional and congruent with `fields`.

use log::debug;

use crate::error::{DataSourceError, Result};
use crate::headerify;
use crate::source::DataSource;
use crate::value::{Row, Value};

/// The RowStore holds the rows of the grid and their field names.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    /// Row records, each congruent with `fields`.
    rows: Vec<Row>,

    /// Field (column) names, in column order.
    fields: Vec<String>,

    /// Explicit header strings. When unset, headers are derived from fields.
    headers: Option<Vec<String>>,
}

impl RowStore {
    /// Creates a new store from rows and their field names.
    pub fn new(rows: Vec<Row>, fields: Vec<String>) -> Self {
        RowStore {
            rows,
            fields,
            headers: None,
        }
    }

    /// Builds a store from a JSON array of objects.
    /// Fields come from the first object's member names; names starting
    /// with `__` are private to the caller and never become columns.
    pub fn from_json(text: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        let records = parsed
            .as_array()
            .ok_or_else(|| DataSourceError::InvalidRecord("expected a JSON array".to_string()))?;

        let fields: Vec<String> = match records.first() {
            Some(serde_json::Value::Object(first)) => first
                .keys()
                .filter(|name| !name.starts_with("__"))
                .cloned()
                .collect(),
            Some(other) => {
                return Err(DataSourceError::InvalidRecord(format!(
                    "expected an object, found {}",
                    other
                )))
            }
            None => Vec::new(),
        };

        let mut rows = Vec::with_capacity(records.len());
        for (y, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                DataSourceError::InvalidRecord(format!("row {} is not an object", y))
            })?;
            let values = fields
                .iter()
                .map(|field| object.get(field).map(Value::from).unwrap_or(Value::Empty))
                .collect();
            rows.push(Row::new(values));
        }

        debug!("row store loaded {} rows x {} fields", rows.len(), fields.len());
        Ok(RowStore::new(rows, fields))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Replaces the whole row collection.
    pub fn set_data(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    pub fn set_fields(&mut self, fields: Vec<String>) {
        self.fields = fields;
    }

    /// Header strings, congruent with fields.
    pub fn get_headers(&self) -> Vec<String> {
        match &self.headers {
            Some(headers) => headers.clone(),
            None => self.fields.iter().map(|f| headerify::transform(f)).collect(),
        }
    }

    pub fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = Some(headers);
    }

    /// Appends a row and returns its position.
    pub fn push_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    // ========================================================================
    // FIND / REPLACE / REMOVE BY KEY
    // ========================================================================

    /// Position of the first row whose `field` equals `value`.
    pub fn find_row(&self, field: &str, value: &Value) -> Result<Option<usize>> {
        self.find_row_where(&[(field, value.clone())])
    }

    /// Position of the first row matching every `(field, value)` pair.
    /// An empty criteria list matches nothing.
    pub fn find_row_where(&self, criteria: &[(&str, Value)]) -> Result<Option<usize>> {
        if criteria.is_empty() {
            return Ok(None);
        }

        let mut resolved = Vec::with_capacity(criteria.len());
        for (field, value) in criteria {
            let x = self
                .field_index(field)
                .ok_or_else(|| DataSourceError::UnknownField(field.to_string()))?;
            resolved.push((x, value));
        }

        Ok(self.rows.iter().position(|row| {
            resolved
                .iter()
                .all(|(x, value)| row.get(*x).map_or(false, |v| v == *value))
        }))
    }

    /// Replaces the row at `y`, returning the previous row.
    pub fn replace_row(&mut self, y: usize, row: Row) -> Result<Row> {
        let count = self.rows.len();
        let slot = self
            .rows
            .get_mut(y)
            .ok_or(DataSourceError::RowOutOfRange { row: y, count })?;
        Ok(std::mem::replace(slot, row))
    }

    /// Removes the row at `y`, shifting later rows up.
    pub fn remove_row(&mut self, y: usize) -> Result<Row> {
        if y >= self.rows.len() {
            return Err(DataSourceError::RowOutOfRange {
                row: y,
                count: self.rows.len(),
            });
        }
        Ok(self.rows.remove(y))
    }
}

impl DataSource for RowStore {
    fn get_row(&self, y: usize) -> Option<&Row> {
        self.rows.get(y)
    }

    fn set_value(&mut self, x: usize, y: usize, value: Value) -> Result<()> {
        let column_count = self.fields.len();
        if x >= column_count {
            return Err(DataSourceError::ColumnOutOfRange {
                column: x,
                count: column_count,
            });
        }
        let count = self.rows.len();
        let row = self
            .rows
            .get_mut(y)
            .ok_or(DataSourceError::RowOutOfRange { row: y, count })?;

        // Short rows are padded so the row stays congruent with the fields.
        if row.values.len() <= x {
            row.values.resize(x + 1, Value::Empty);
        }
        row.values[x] = value;
        Ok(())
    }

    fn get_row_count(&self) -> usize {
        self.rows.len()
    }

    fn get_fields(&self) -> &[String] {
        &self.fields
    }
}

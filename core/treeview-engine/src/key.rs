//! FILENAME: core/treeview-engine/src/key.rs
//! Group keys - hashable renditions of source values.
//!
//! Partitioning buckets rows by the value of a grouping column, so the
//! value has to be usable as a hash key. Numbers go through `OrderedFloat`.

use std::fmt;

use datasource::Value;
use serde::{Deserialize, Serialize};

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            // All NaN values hash to the same thing
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 are equal, so they must hash alike
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// The value a group node represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupValue {
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
}

impl From<&Value> for GroupValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Empty => GroupValue::Empty,
            Value::Number(n) => GroupValue::Number(OrderedFloat(*n)),
            Value::Text(s) => GroupValue::Text(s.clone()),
            Value::Boolean(b) => GroupValue::Boolean(*b),
        }
    }
}

impl From<Value> for GroupValue {
    fn from(value: Value) -> Self {
        GroupValue::from(&value)
    }
}

impl From<&str> for GroupValue {
    fn from(value: &str) -> Self {
        GroupValue::Text(value.to_string())
    }
}

impl From<f64> for GroupValue {
    fn from(value: f64) -> Self {
        GroupValue::Number(OrderedFloat(value))
    }
}

impl GroupValue {
    pub fn to_value(&self) -> Value {
        match self {
            GroupValue::Empty => Value::Empty,
            GroupValue::Number(n) => Value::Number(n.0),
            GroupValue::Text(s) => Value::Text(s.clone()),
            GroupValue::Boolean(b) => Value::Boolean(*b),
        }
    }

    /// Display label for a group row.
    pub fn label(&self) -> String {
        match self {
            GroupValue::Empty => "(blank)".to_string(),
            other => other.to_value().display_value(),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Addresses a group by its key values from the top level down.
/// `["A", "x"]` is group `x` inside top-level group `A`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupPath(pub Vec<GroupValue>);

impl GroupPath {
    pub fn new(keys: Vec<GroupValue>) -> Self {
        GroupPath(keys)
    }

    pub fn root() -> Self {
        GroupPath(Vec::new())
    }

    pub fn child(&self, key: GroupValue) -> Self {
        let mut keys = self.0.clone();
        keys.push(key);
        GroupPath(keys)
    }

    pub fn keys(&self) -> &[GroupValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<GroupValue>> FromIterator<K> for GroupPath {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        GroupPath(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(GroupValue::label).collect();
        f.write_str(&parts.join("/"))
    }
}

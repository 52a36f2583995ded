//! FILENAME: core/treeview-engine/src/aggregator.rs
//! Aggregator - rollups over the leaf rows beneath a group.
//!
//! Built-in reducers run through an accumulator in one pass over the
//! group's `index`. Custom reducers are registered by name and receive
//! the column values of those rows.
//!
//! Results are cached per (group path, column, reducer). The cache belongs
//! to one tree generation: a regroup or refilter starts from `fresh()`,
//! while sorting keeps it since membership is unchanged.

use std::fmt;
use std::sync::Arc;

use datasource::{BoxError, DataSource, Value};
use rustc_hash::FxHashMap;

use crate::definition::{AggregationType, FieldIndex};
use crate::error::{Result, TreeviewError};
use crate::key::GroupPath;
use crate::node::GroupNode;

/// A caller-supplied reducer: column values in, rollup (or none) out.
pub type ReducerFn =
    Arc<dyn Fn(&[Value]) -> std::result::Result<Option<Value>, BoxError> + Send + Sync>;

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Single-pass state for the built-in reducers.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    pub sum: f64,
    /// Rows seen, numeric or not.
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: &Value) {
        self.count += 1;
        if let Some(n) = value.as_number() {
            self.count_numbers += 1;
            self.sum += n;
            self.min = Some(self.min.map_or(n, |m| m.min(n)));
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }
    }

    /// Final value for a built-in reducer. Only `Count` has a value over
    /// an empty (or all non-numeric) row set.
    pub fn compute(&self, aggregation: &AggregationType) -> Option<Value> {
        match aggregation {
            AggregationType::Count => Some(Value::Number(self.count as f64)),
            AggregationType::Sum => (self.count_numbers > 0).then(|| Value::Number(self.sum)),
            AggregationType::Average => (self.count_numbers > 0)
                .then(|| Value::Number(self.sum / self.count_numbers as f64)),
            AggregationType::Min => self.min.map(Value::Number),
            AggregationType::Max => self.max.map(Value::Number),
            AggregationType::Custom(_) => None,
        }
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AggregateKey {
    path: GroupPath,
    column: FieldIndex,
    aggregation: AggregationType,
}

#[derive(Clone, Default)]
pub struct Aggregator {
    reducers: FxHashMap<String, ReducerFn>,
    cache: FxHashMap<AggregateKey, Option<Value>>,
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.reducers.keys().collect();
        names.sort();
        f.debug_struct("Aggregator")
            .field("reducers", &names)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom reducer, usable as `AggregationType::Custom(name)`.
    pub fn register_reducer<F>(&mut self, name: impl Into<String>, reducer: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Option<Value>, BoxError> + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(reducer));
    }

    pub fn has_reducer(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    /// Same reducers, empty cache. Used to start a new tree generation.
    pub fn fresh(&self) -> Self {
        Aggregator {
            reducers: self.reducers.clone(),
            cache: FxHashMap::default(),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Checks that a reducer can be evaluated by this aggregator.
    pub fn validate(&self, aggregation: &AggregationType) -> Result<()> {
        match aggregation {
            AggregationType::Custom(name) if !self.has_reducer(name) => Err(
                TreeviewError::Configuration(format!("unknown reducer '{}'", name)),
            ),
            _ => Ok(()),
        }
    }

    /// Rollup of `column` over every leaf row under `group`, cached.
    pub fn aggregate<S: DataSource + ?Sized>(
        &mut self,
        group: &GroupNode,
        column: FieldIndex,
        aggregation: &AggregationType,
        source: &S,
    ) -> Result<Option<Value>> {
        let key = AggregateKey {
            path: group.path().clone(),
            column,
            aggregation: aggregation.clone(),
        };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let value = self.compute(group.get_index(), column, aggregation, source)?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    /// Uncached rollup of `column` over the given source rows.
    pub fn compute<S: DataSource + ?Sized>(
        &self,
        rows: &[usize],
        column: FieldIndex,
        aggregation: &AggregationType,
        source: &S,
    ) -> Result<Option<Value>> {
        let cell = |row: usize| source.get_value(column, row).unwrap_or(&Value::Empty);

        match aggregation {
            AggregationType::Custom(name) => {
                let reducer = self.reducers.get(name).ok_or_else(|| {
                    TreeviewError::Configuration(format!("unknown reducer '{}'", name))
                })?;
                let values: Vec<Value> = rows.iter().map(|&row| cell(row).clone()).collect();
                reducer(&values).map_err(TreeviewError::Reducer)
            }
            builtin => {
                let mut acc = AggregateAccumulator::new();
                for &row in rows {
                    acc.add(cell(row));
                }
                Ok(acc.compute(builtin))
            }
        }
    }
}

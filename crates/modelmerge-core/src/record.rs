//! Dynamic model instances.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// A record of some registered model: the model name plus its column values.
///
/// Absent columns read as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    model: String,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record of `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style column assignment.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// The model this record belongs to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Read a column; absent columns are NULL.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    /// Set a column, returning the previous value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(column.into(), value.into())
    }

    /// Whether the column is blank (absent, NULL or empty text).
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).is_blank()
    }

    /// Column names present on this record.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Column/value pairs present on this record.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

use super::Value;

use std::sync::Arc;

/// A named record: column names plus their values, in declaration order.
///
/// Column names are shared across all rows of one fetch, so they live
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs. Intended for tests and
    /// template-produced rows; fetched rows share their column header.
    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named column, if the row carries it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &mut self.values[idx])
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        if let Some(slot) = self.get_mut(column) {
            *slot = value.into();
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

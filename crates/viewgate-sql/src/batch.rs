use viewgate_core::stmt::{Row, Value};

/// Parent key values and their child-side column names, used to build a
/// child-fetch IN-clause.
///
/// Rebuilt per read pass and immutable once built. `offset` records how
/// many parent keys preceding windows already consumed, so successive
/// slices advance across one read pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchData {
    columns: Vec<String>,
    tuples: Vec<Vec<Value>>,
    offset: usize,
}

impl BatchData {
    pub fn new(columns: Vec<String>, tuples: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            tuples,
            offset: 0,
        }
    }

    /// Collect distinct parent key tuples from resolved parent rows.
    ///
    /// `parent_columns` are read from the rows; `child_columns` name the
    /// columns the child fetch filters on. Tuples containing only nulls
    /// are dropped; duplicates keep their first position.
    pub fn from_rows(
        parent_columns: &[&str],
        child_columns: &[&str],
        rows: &[Row],
    ) -> Self {
        let mut tuples: Vec<Vec<Value>> = Vec::new();

        for row in rows {
            let tuple: Vec<Value> = parent_columns
                .iter()
                .map(|col| row.get(col).cloned().unwrap_or(Value::Null))
                .collect();

            if tuple.iter().all(Value::is_null) {
                continue;
            }
            if !tuples.contains(&tuple) {
                tuples.push(tuple);
            }
        }

        Self {
            columns: child_columns.iter().map(|c| c.to_string()).collect(),
            tuples,
            offset: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn tuples(&self) -> &[Vec<Value>] {
        &self.tuples
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// The window of up to `size` key tuples starting at `offset`.
    /// Returns `None` once every parent key has been consumed.
    pub fn window(&self, offset: usize, size: usize) -> Option<BatchData> {
        if offset >= self.tuples.len() {
            return None;
        }
        let end = (offset + size).min(self.tuples.len());
        Some(BatchData {
            columns: self.columns.clone(),
            tuples: self.tuples[offset..end].to_vec(),
            offset,
        })
    }

    /// Flattened arguments: per tuple, per column.
    pub fn args(&self) -> Vec<Value> {
        self.tuples.iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_preserving_order() {
        let rows = vec![
            Row::from_pairs([("id", 2i64)]),
            Row::from_pairs([("id", 1i64)]),
            Row::from_pairs([("id", 2i64)]),
        ];

        let batch = BatchData::from_rows(&["id"], &["user_id"], &rows);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.tuples()[0], vec![Value::I64(2)]);
        assert_eq!(batch.tuples()[1], vec![Value::I64(1)]);
        assert_eq!(batch.columns(), ["user_id".to_string()]);
    }

    #[test]
    fn null_only_tuples_are_dropped() {
        let rows = vec![Row::from_pairs([("id", Value::Null)])];
        let batch = BatchData::from_rows(&["id"], &["user_id"], &rows);
        assert!(batch.is_empty());
    }

    #[test]
    fn windows_advance_offset() {
        let tuples: Vec<Vec<Value>> = (0..5).map(|i| vec![Value::I64(i)]).collect();
        let batch = BatchData::new(vec!["user_id".into()], tuples);

        let first = batch.window(0, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.offset(), 0);

        let last = batch.window(4, 2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.offset(), 4);

        assert!(batch.window(5, 2).is_none());
    }
}

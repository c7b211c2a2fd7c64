use crate::Executable;
use viewgate_core::{stmt::Row, stmt::Value, Error, Result};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Allocates values from a named database sequence. Provided by the
/// surrounding layer; the default DataUnit has none.
pub trait SequenceAllocator: std::fmt::Debug + Send + Sync + 'static {
    fn next_value(&self, sequence: &str) -> Result<i64>;
}

/// One entry of a template evaluation's ordered output journal.
#[derive(Debug, Clone)]
pub enum Pending {
    /// A raw SQL statement with its bound arguments.
    Raw { sql: String, args: Vec<Value> },

    /// A deferred table-scoped DML operation.
    Exec(Arc<Executable>),
}

/// Per-template-evaluation scratchpad.
///
/// Accumulates bound arguments (lock-protected, in emission order),
/// generated multi-statement SQL text, and pending executables. Owned by
/// exactly one evaluation; reuse requires [`DataUnit::reset`]. Not safe
/// to share across concurrent evaluations.
#[derive(Debug, Default)]
pub struct DataUnit {
    args: Mutex<Vec<Value>>,
    sql: Mutex<String>,
    pending: Mutex<Vec<Pending>>,
    sequences: Mutex<Option<Arc<dyn SequenceAllocator>>>,
}

impl DataUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequences(allocator: Arc<dyn SequenceAllocator>) -> Self {
        let unit = Self::default();
        *unit.sequences.lock().expect("unit poisoned") = Some(allocator);
        unit
    }

    /// Append bound arguments in emission order. Argument order must
    /// exactly match placeholder order within one evaluation.
    pub fn push_args(&self, args: &[Value]) {
        self.args.lock().expect("unit poisoned").extend_from_slice(args);
    }

    pub fn args_snapshot(&self) -> Vec<Value> {
        self.args.lock().expect("unit poisoned").clone()
    }

/// Append generated statement text to the evaluation's SQL buffer.
    pub fn append_sql(&self, fragment: &str) {
        let mut sql = self.sql.lock().expect("unit poisoned");
        if !sql.is_empty() && !sql.ends_with('\n') {
            sql.push('\n');
        }
        sql.push_str(fragment);
    }

    pub fn sql_snapshot(&self) -> String {
        self.sql.lock().expect("unit poisoned").clone()
    }

    /// Record a raw SQL statement for execution, with its arguments.
    pub fn add_statement(&self, sql: impl Into<String>, args: Vec<Value>) {
        let sql = sql.into();
        self.append_sql(&sql);
        self.pending
            .lock()
            .expect("unit poisoned")
            .push(Pending::Raw { sql, args });
    }

    /// Template marker: insert `row` into `table`.
    pub fn insert(&self, table: impl Into<String>, row: Row) {
        self.push_executable(Executable::insert(table, vec![row]));
    }

    /// Template marker: insert many rows into `table`.
    pub fn insert_all(&self, table: impl Into<String>, rows: Vec<Row>) {
        self.push_executable(Executable::insert(table, rows));
    }

    /// Template marker: update the row identified by `key_columns`.
    pub fn update(&self, table: impl Into<String>, row: Row, key_columns: Vec<String>) {
        self.push_executable(Executable::update(table, row, key_columns));
    }

    /// Template marker: delete the row identified by `key_columns`.
    pub fn delete(&self, table: impl Into<String>, row: Row, key_columns: Vec<String>) {
        self.push_executable(Executable::delete(table, row, key_columns));
    }

    fn push_executable(&self, executable: Executable) {
        self.pending
            .lock()
            .expect("unit poisoned")
            .push(Pending::Exec(Arc::new(executable)));
    }

    /// Template helper: a fresh unique id.
    pub fn unique_id(&self) -> Value {
        Value::String(uuid::Uuid::new_v4().to_string())
    }

    /// Template helper: the next value of a named database sequence.
    pub fn next_sequence(&self, sequence: &str) -> Result<i64> {
        let allocator = self.sequences.lock().expect("unit poisoned").clone();
        match allocator {
            Some(allocator) => allocator.next_value(sequence),
            None => Err(Error::driver(format!(
                "no sequence allocator configured; cannot allocate from `{sequence}`"
            ))),
        }
    }

    /// The ordered journal of pending work, with each table's final
    /// insert flagged so the executor knows when to flush its batch.
    pub fn pending(&self) -> Vec<Pending> {
        let pending = self.pending.lock().expect("unit poisoned").clone();

        let mut last_insert: HashMap<&str, usize> = HashMap::new();
        for (index, entry) in pending.iter().enumerate() {
            if let Pending::Exec(exec) = entry {
                if exec.kind == viewgate_core::metrics::OpKind::Insert {
                    last_insert.insert(exec.table.as_str(), index);
                }
            }
        }
        for (index, entry) in pending.iter().enumerate() {
            if let Pending::Exec(exec) = entry {
                if exec.kind == viewgate_core::metrics::OpKind::Insert {
                    exec.set_last_for_table(last_insert.get(exec.table.as_str()) == Some(&index));
                }
            }
        }

        pending
    }

    /// Clear the unit for reuse by a subsequent evaluation.
    pub fn reset(&self) {
        self.args.lock().expect("unit poisoned").clear();
        self.sql.lock().expect("unit poisoned").clear();
        self.pending.lock().expect("unit poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything() {
        let unit = DataUnit::new();
        unit.push_args(&[Value::I64(1)]);
        unit.add_statement("DELETE FROM events", vec![]);
        unit.insert("events", Row::from_pairs([("id", 1i64)]));

        unit.reset();

        assert!(unit.args_snapshot().is_empty());
        assert!(unit.sql_snapshot().is_empty());
        assert!(unit.pending().is_empty());
    }

    #[test]
    fn last_insert_per_table_is_flagged() {
        let unit = DataUnit::new();
        unit.insert("events", Row::from_pairs([("id", 1i64)]));
        unit.insert("users", Row::from_pairs([("id", 2i64)]));
        unit.insert("events", Row::from_pairs([("id", 3i64)]));

        let pending = unit.pending();
        let flags: Vec<bool> = pending
            .iter()
            .map(|p| match p {
                Pending::Exec(e) => e.is_last_for_table(),
                Pending::Raw { .. } => false,
            })
            .collect();

        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn unique_id_is_fresh() {
        let unit = DataUnit::new();
        assert_ne!(unit.unique_id(), unit.unique_id());
    }
}

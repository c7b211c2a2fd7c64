use viewgate_core::{metrics::OpKind, stmt::Row};

use std::sync::atomic::{AtomicBool, Ordering};

/// A deferred table-scoped DML operation produced during template
/// evaluation and consumed exactly once by the statement executor.
///
/// `executed` transitions false to true exactly once; an executable is
/// never re-applied, including across the executor's retry.
#[derive(Debug)]
pub struct Executable {
    pub table: String,
    pub kind: OpKind,

    /// Payload rows. Inserts may carry many; updates and deletes carry
    /// one row each.
    pub rows: Vec<Row>,

    /// Columns identifying the target row for updates and deletes.
    pub key_columns: Vec<String>,

    /// Marks the final insert for its table, which tells the executor
    /// when to flush that table's batch.
    last_for_table: AtomicBool,

    executed: AtomicBool,
}

impl Executable {
    pub fn insert(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self::new(table, OpKind::Insert, rows, Vec::new())
    }

    pub fn update(table: impl Into<String>, row: Row, key_columns: Vec<String>) -> Self {
        Self::new(table, OpKind::Update, vec![row], key_columns)
    }

    pub fn delete(table: impl Into<String>, row: Row, key_columns: Vec<String>) -> Self {
        Self::new(table, OpKind::Delete, vec![row], key_columns)
    }

    fn new(
        table: impl Into<String>,
        kind: OpKind,
        rows: Vec<Row>,
        key_columns: Vec<String>,
    ) -> Self {
        Self {
            table: table.into(),
            kind,
            rows,
            key_columns,
            last_for_table: AtomicBool::new(false),
            executed: AtomicBool::new(false),
        }
    }

    /// Claim this executable for execution. Returns false when it has
    /// already been applied, in which case the caller must skip it.
    pub fn mark_executed(&self) -> bool {
        self.executed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub(crate) fn set_last_for_table(&self, last: bool) {
        self.last_for_table.store(last, Ordering::Release);
    }

    pub fn is_last_for_table(&self) -> bool {
        self.last_for_table.load(Ordering::Acquire)
    }
}

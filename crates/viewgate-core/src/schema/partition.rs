use crate::stmt::Value;

/// Optional sharding predicate AND'd into a view's WHERE clause.
///
/// `table_override`, when set, replaces the queried table name so one
/// view definition can span physical shards.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// SQL expression with `?` placeholders.
    pub expression: String,

    /// Values bound to the expression's placeholders.
    pub placeholders: Vec<Value>,

    /// Physical table-name substitution, when the shard lives in its own
    /// table.
    pub table_override: Option<String>,
}

impl Partition {
    pub fn new(expression: impl Into<String>, placeholders: Vec<Value>) -> Self {
        Self {
            expression: expression.into(),
            placeholders,
            table_override: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_override = Some(table.into());
        self
    }

    /// Number of `?` placeholders in the expression.
    pub fn placeholder_count(&self) -> usize {
        self.expression.matches('?').count()
    }
}

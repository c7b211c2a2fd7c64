use viewgate_core::stmt::Value;

/// A parameterized query produced by the builder: SQL text plus its
/// positional arguments, optionally tagged with a cache-routing key and
/// the parent-batch window it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub sql: String,
    pub args: Vec<Value>,

    /// Page-independent routing key, present when the view caches.
    pub cache_key: Option<String>,

    /// Parent-batch bookkeeping: how many parent keys preceding batches
    /// already consumed, and how many this query covers.
    pub batch_offset: usize,
    pub batch_len: usize,
}

impl Matcher {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
            cache_key: None,
            batch_offset: 0,
            batch_len: 0,
        }
    }
}

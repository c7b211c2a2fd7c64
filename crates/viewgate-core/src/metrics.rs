use std::{fmt::Debug, time::Duration};

/// Operation kind recorded by write metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Insert,
    Update,
    Delete,
    Raw,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Raw => "raw",
        }
    }
}

/// One physical read recorded by the orchestrator.
#[derive(Debug, Clone)]
pub struct FetchMetric {
    pub view: String,
    pub elapsed: Duration,
    pub rows: u64,
    pub success: bool,
}

/// One table-level write operation recorded by the statement executor.
#[derive(Debug, Clone)]
pub struct OpMetric {
    pub table: String,
    pub kind: OpKind,
    pub elapsed: Duration,
    pub affected: u64,
    pub error: Option<String>,
}

/// Cache outcome attached to a fetch when caching applies.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }
}

/// Destination for engine metrics. The default sink logs through
/// `tracing`; callers needing aggregation plug in their own.
pub trait MetricSink: Debug + Send + Sync + 'static {
    fn record_fetch(&self, metric: FetchMetric);
    fn record_op(&self, metric: OpMetric);
}

/// Logs every metric at debug level.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn record_fetch(&self, metric: FetchMetric) {
        tracing::debug!(
            view = %metric.view,
            elapsed_ms = metric.elapsed.as_millis() as u64,
            rows = metric.rows,
            success = metric.success,
            "fetch"
        );
    }

    fn record_op(&self, metric: OpMetric) {
        tracing::debug!(
            table = %metric.table,
            kind = metric.kind.as_str(),
            elapsed_ms = metric.elapsed.as_millis() as u64,
            affected = metric.affected,
            error = metric.error.as_deref().unwrap_or(""),
            "op"
        );
    }
}

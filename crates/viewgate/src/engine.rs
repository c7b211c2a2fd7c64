mod exec;
pub use exec::{ExecStats, TxMode};

mod read;
pub use read::ReadStats;

use crate::{cache::ReadCache, collector::Lifecycle};
use viewgate_core::{
    driver::Source,
    metrics::{MetricSink, TracingSink},
};
use viewgate_sql::ExpanderRegistry;

use std::sync::Arc;

/// The execution engine: one logical source plus the shared read-mostly
/// state (expander registry, metric sink, optional cache and hooks).
///
/// Cheap to clone; clones share the registry and cache.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) source: Arc<dyn Source>,
    pub(crate) registry: ExpanderRegistry,
    pub(crate) metrics: Arc<dyn MetricSink>,
    pub(crate) cache: Option<Arc<dyn ReadCache>>,
    pub(crate) hooks: Option<Arc<dyn Lifecycle>>,
}

impl Engine {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            registry: ExpanderRegistry::new(),
            metrics: Arc::new(TracingSink),
            cache: None,
            hooks: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ReadCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn Lifecycle>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// The per-type criteria expander cache owned by this engine.
    pub fn registry(&self) -> &ExpanderRegistry {
        &self.registry
    }
}

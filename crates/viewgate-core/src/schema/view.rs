use super::{CacheConfig, Column, Partition, Relation, SelectorConstraints, Source};
use crate::{Error, Result};

/// Default number of parent keys covered by one child-fetch IN-clause.
pub const DEFAULT_MATCH_BATCH_SIZE: usize = 1024;

/// Declarative description of a relational source: its table or SQL
/// fragment, declared columns, child relations, and per-view policy.
///
/// Views are read-only to the engine; per-request state lives in the
/// [`Selector`](crate::Selector).
#[derive(Debug, Clone)]
pub struct View {
    pub name: String,
    pub source: Source,

    /// Alias used to qualify columns when the source needs one.
    pub alias: Option<String>,

    pub columns: Vec<Column>,
    pub relations: Vec<Relation>,
    pub constraints: SelectorConstraints,

    pub cache: Option<CacheConfig>,

    /// Parent keys covered per child-fetch IN-clause before splitting.
    pub match_batch_size: usize,

    /// Default ORDER BY, overridden by a request-level order-by.
    pub order_by: Option<String>,

    pub partition: Option<Partition>,

    /// Evaluated fragment for the meta/count probe, when the view wants
    /// one issued alongside its main fetch.
    pub summary: Option<String>,

    /// When templating and discovery are both active, this hint is
    /// appended to the evaluated fragment so the database reports the
    /// fragment's column set.
    pub discovery_hint: Option<String>,
}

impl View {
    pub fn new(name: impl Into<String>, source: impl Into<Source>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            alias: None,
            columns: Vec::new(),
            relations: Vec::new(),
            constraints: SelectorConstraints::ALL,
            cache: None,
            match_batch_size: DEFAULT_MATCH_BATCH_SIZE,
            order_by: None,
            partition: None,
            summary: None,
            discovery_hint: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_constraints(mut self, constraints: SelectorConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_match_batch_size(mut self, size: usize) -> Self {
        self.match_batch_size = size;
        self
    }

    /// Look up a declared column, failing with a view-qualified error.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::unknown_column(&self.name, name))
    }

pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// The table this view reads, honoring any partition override.
    pub fn physical_table(&self) -> Option<&str> {
        if let Some(partition) = &self.partition {
            if let Some(table) = &partition.table_override {
                return Some(table);
            }
        }
        self.source.table_name()
    }
}

use viewgate_core::{
    schema::{Cardinality, Relation, View},
    stmt::Row,
};

use indexmap::IndexMap;
use std::{collections::HashMap, fmt::Debug, sync::Mutex};

/// Destination for fetched rows.
///
/// Rows arrive through `visit` as they stream in and stay buffered until
/// the orchestrator marks the view `fetched`, which flushes them into
/// the typed destination.
pub trait Collector: Debug + Send + Sync + 'static {
    fn visit(&self, view: &View, row: Row);

    /// The view's fetch (and, for ordered strategies, its children)
    /// completed; flush its buffered rows.
    fn fetched(&self, view: &View);

    /// Result of the view's meta/count probe, when it declares one.
    fn summary(&self, view: &View, rows: Vec<Row>) {
        let _ = (view, rows);
    }
}

/// Per-view row hooks applied by the orchestrator.
///
/// `on_fetch` runs per row as it streams in, before the row reaches the
/// collector; `on_relation` runs per row once the view and its children
/// are complete.
pub trait Lifecycle: Debug + Send + Sync + 'static {
    fn on_fetch(&self, view: &View, row: &mut Row) {
        let _ = (view, row);
    }

    fn on_relation(&self, view: &View, row: &mut Row) {
        let _ = (view, row);
    }
}

/// One assembled result node: a row plus its nested children, keyed by
/// relation name.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub row: Row,
    pub children: IndexMap<String, Vec<Node>>,
}

/// Collector that assembles the fetched hierarchy into nested
/// parent/child object graphs keyed by the relation links.
#[derive(Debug, Default)]
pub struct TreeCollector {
    buffered: Mutex<HashMap<String, Vec<Row>>>,
    flushed: Mutex<HashMap<String, Vec<Row>>>,
    summaries: Mutex<HashMap<String, Vec<Row>>>,
}

impl TreeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flushed rows of one view, in visit order.
    pub fn rows(&self, view: &str) -> Vec<Row> {
        self.flushed
            .lock()
            .expect("collector poisoned")
            .get(view)
            .cloned()
            .unwrap_or_default()
    }

    pub fn summary_rows(&self, view: &str) -> Vec<Row> {
        self.summaries
            .lock()
            .expect("collector poisoned")
            .get(view)
            .cloned()
            .unwrap_or_default()
    }

    /// Assemble the object graph rooted at `view` from the flushed rows.
    pub fn into_graph(&self, view: &View) -> Vec<Node> {
        let flushed = self.flushed.lock().expect("collector poisoned");
        Self::assemble(&flushed, view, None)
    }

    fn assemble(
        flushed: &HashMap<String, Vec<Row>>,
        view: &View,
        parent: Option<(&Relation, &Row)>,
    ) -> Vec<Node> {
        let rows = flushed.get(&view.name).cloned().unwrap_or_default();

        let mut nodes = Vec::new();
        for row in rows {
            // When assembling under a parent, keep only rows whose child
            // link columns match the parent's key values.
            if let Some((relation, parent_row)) = parent {
                let matches = relation.on.iter().all(|link| {
                    parent_row.get(&link.parent_column) == row.get(&link.child_column)
                });
                if !matches {
                    continue;
                }
            }

            let mut children = IndexMap::new();
            for relation in &view.relations {
                let nested = Self::assemble(flushed, &relation.child, Some((relation, &row)));
                let nested = match relation.cardinality {
                    Cardinality::OneToOne => nested.into_iter().take(1).collect(),
                    Cardinality::OneToMany => nested,
                };
                children.insert(relation.name.clone(), nested);
            }

            nodes.push(Node { row, children });
        }

        nodes
    }
}

impl Collector for TreeCollector {
    fn visit(&self, view: &View, row: Row) {
        self.buffered
            .lock()
            .expect("collector poisoned")
            .entry(view.name.clone())
            .or_default()
            .push(row);
    }

    fn fetched(&self, view: &View) {
        let buffered = self
            .buffered
            .lock()
            .expect("collector poisoned")
            .remove(&view.name)
            .unwrap_or_default();
        self.flushed
            .lock()
            .expect("collector poisoned")
            .entry(view.name.clone())
            .or_default()
            .extend(buffered);
    }

    fn summary(&self, view: &View, rows: Vec<Row>) {
        self.summaries
            .lock()
            .expect("collector poisoned")
            .insert(view.name.clone(), rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewgate_core::schema::Link;

    #[test]
    fn rows_stay_buffered_until_fetched() {
        let collector = TreeCollector::new();
        let view = View::new("events", "events");

        collector.visit(&view, Row::from_pairs([("id", 1i64)]));
        assert!(collector.rows("events").is_empty());

        collector.fetched(&view);
        assert_eq!(collector.rows("events").len(), 1);
    }

    #[test]
    fn graph_nests_children_by_links() {
        let child = View::new("events", "events");
        let root = View::new("users", "users").with_relation(Relation::new(
            "events",
            Cardinality::OneToMany,
            vec![Link::new("id", "user_id")],
            child.clone(),
        ));

        let collector = TreeCollector::new();
        collector.visit(&root, Row::from_pairs([("id", 1i64)]));
        collector.visit(&root, Row::from_pairs([("id", 2i64)]));
        collector.visit(&child, Row::from_pairs([("id", 10i64), ("user_id", 1i64)]));
        collector.visit(&child, Row::from_pairs([("id", 11i64), ("user_id", 1i64)]));
        collector.fetched(&child);
        collector.fetched(&root);

        let graph = collector.into_graph(&root);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0].children["events"].len(), 2);
        assert_eq!(graph[1].children["events"].len(), 0);
    }
}

use super::Engine;
use crate::{collector::Collector, session::Session};

use viewgate_core::{
    metrics::{CacheStats, FetchMetric},
    schema::{MatchStrategy, Relation, Source as ViewSource, View},
    stmt::Row,
    Error, Result, Selector,
};
use viewgate_sql::{build, BatchData, DataUnit, Exclusions, Matcher};

use async_recursion::async_recursion;
use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use tokio::task::JoinSet;

/// Aggregated outcome of one hierarchy read.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    pub fetches: Vec<FetchMetric>,
    pub cache: CacheStats,
}

/// First-error collector shared by every branch of the read.
///
/// Once set, no further fetch is issued anywhere in the tree; in-flight
/// branches drain to their join points.
#[derive(Debug, Default)]
struct Failure {
    first: Mutex<Option<Error>>,
}

impl Failure {
    fn record(&self, err: Error) {
        let mut first = self.first.lock().expect("failure poisoned");
        if first.is_none() {
            *first = Some(err);
        }
    }

    fn is_set(&self) -> bool {
        self.first.lock().expect("failure poisoned").is_some()
    }

    fn take(&self) -> Option<Error> {
        self.first.lock().expect("failure poisoned").take()
    }
}

struct ReadContext {
    engine: Engine,
    session: Arc<Session>,
    collector: Arc<dyn Collector>,
    failure: Failure,
    stats: Mutex<ReadStats>,
}

impl Engine {
    /// Fetch the full view hierarchy rooted at `view`, visiting rows into
    /// `collector` with as much concurrency as the tree's match
    /// strategies permit.
    ///
    /// Returns the aggregated fetch/cache statistics, or the first error
    /// any branch produced. The collector is never left with a partially
    /// populated tree without an error being returned.
    pub async fn read(
        &self,
        view: Arc<View>,
        session: Arc<Session>,
        collector: Arc<dyn Collector>,
    ) -> Result<ReadStats> {
        let ctx = Arc::new(ReadContext {
            engine: self.clone(),
            session,
            collector,
            failure: Failure::default(),
            stats: Mutex::new(ReadStats::default()),
        });

        read_view(ctx.clone(), view, None, Arc::new(Vec::new())).await;

        if let Some(err) = ctx.failure.take() {
            return Err(err);
        }
        let stats = ctx.stats.lock().expect("stats poisoned").clone();
        Ok(stats)
    }
}

#[async_recursion]
async fn read_view(
    ctx: Arc<ReadContext>,
    view: Arc<View>,
    relation: Option<Arc<Relation>>,
    parent_rows: Arc<Vec<Row>>,
) {
    let selector = ctx.session.statelet(&view);
    if selector.ignored {
        return;
    }

    // Cooperative short-circuit: a failed branch anywhere stops new work.
    if ctx.failure.is_set() {
        return;
    }

    let rows = match fetch_view(&ctx, &view, &selector, relation.as_deref(), &parent_rows).await {
        Ok(rows) => rows,
        Err(err) => {
            ctx.failure.record(err);
            return;
        }
    };

    let rows = Arc::new(rows);
    let gated = view
        .relations
        .iter()
        .any(|r| r.strategy == MatchStrategy::Ordered);

    // Full-parallel strategies flush this view as soon as its own rows
    // are in; ordered strategies gate the notification on the children.
    if !gated {
        complete_view(&ctx, &view, &rows);
    }

    let mut children = JoinSet::new();
    for rel in &view.relations {
        let rel = Arc::new(rel.clone());
        let child = Arc::new(rel.child.clone());
        children.spawn(read_view(
            ctx.clone(),
            child,
            Some(rel),
            rows.clone(),
        ));
    }

    // Join barrier: every child subtree finishes before this view's
    // branch reports back to its parent.
    while let Some(joined) = children.join_next().await {
        if let Err(err) = joined {
            ctx.failure.record(Error::driver(format!("relation task failed: {err}")));
        }
    }

    if gated {
        complete_view(&ctx, &view, &rows);
    }
}

/// After-relation hooks, then visit and flush the view's rows. Rows only
/// reach the collector here, so hook mutations are what `fetched`
/// flushes.
fn complete_view(ctx: &ReadContext, view: &View, rows: &[Row]) {
    for row in rows {
        let mut row = row.clone();
        if let Some(hooks) = &ctx.engine.hooks {
            hooks.on_relation(view, &mut row);
        }
        ctx.collector.visit(view, row);
    }
    ctx.collector.fetched(view);
}

/// Fetch every row of one view: batch windows over the parent keys, the
/// concurrent summary probe, caching, and per-row lifecycle hooks.
async fn fetch_view(
    ctx: &ReadContext,
    view: &View,
    selector: &Selector,
    relation: Option<&Relation>,
    parent_rows: &[Row],
) -> Result<Vec<Row>> {
    let batch = relation.map(|rel| {
        // Parent rows were resolved by the caller; the child filters on
        // its side of the links.
        let parent_columns = rel.parent_columns();
        let child_columns = rel.child_columns();
        BatchData::from_rows(&parent_columns, &child_columns, parent_rows)
    });

    // A relation whose parent produced zero keys issues no SQL at all.
    if let Some(batch) = &batch {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
    }

    let main = fetch_batches(ctx, view, selector, batch.as_ref(), relation);
    let probe = summary_probe(ctx, view, selector, batch.as_ref(), relation);

    let (rows, probe_result) = tokio::join!(main, probe);
    probe_result?;
    rows
}

async fn fetch_batches(
    ctx: &ReadContext,
    view: &View,
    selector: &Selector,
    batch: Option<&BatchData>,
    relation: Option<&Relation>,
) -> Result<Vec<Row>> {
    let mut collected = Vec::new();

    match batch {
        None => {
            collected.extend(fetch_window(ctx, view, selector, None, relation).await?);
        }
        Some(batch) => {
            let mut offset = 0;
            while let Some(window) = batch.window(offset, view.match_batch_size) {
                if ctx.failure.is_set() {
                    break;
                }
                offset += window.len();
                collected.extend(fetch_window(ctx, view, selector, Some(&window), relation).await?);
            }
        }
    }

    Ok(collected)
}

/// One physical fetch covering one parent-key window.
async fn fetch_window(
    ctx: &ReadContext,
    view: &View,
    selector: &Selector,
    batch: Option<&BatchData>,
    relation: Option<&Relation>,
) -> Result<Vec<Row>> {
    let unit = DataUnit::new();
    let dialect = ctx.engine.source.dialect();

    let matcher = build(
        view,
        selector,
        batch,
        relation,
        Exclusions::none(),
        dialect,
        &unit,
    )?;

    // The cache-routing matcher shares the builder call but excludes
    // pagination, so routing stays page-independent. The stored-entry key
    // re-attaches the page state so distinct pages never collide.
    let cache_key = if view.cache.is_some() {
        let routing = build(
            view,
            selector,
            batch,
            relation,
            Exclusions::cache_key(),
            dialect,
            &unit,
        )?;
        routing
            .cache_key
            .as_deref()
            .map(|key| entry_key(key, selector))
    } else {
        None
    };

    if let (Some(cache), Some(key)) = (&ctx.engine.cache, &cache_key) {
        if let Some(rows) = cache.get(key).await {
            ctx.stats.lock().expect("stats poisoned").cache.hit();
            return Ok(apply_fetch_hook(ctx, view, rows));
        }
        ctx.stats.lock().expect("stats poisoned").cache.miss();
    }

    let rows = execute_matcher(ctx, view, &matcher).await?;

    if let (Some(cache), Some(key), Some(ttl)) = (
        &ctx.engine.cache,
        &cache_key,
        view.cache.as_ref().map(|c| c.ttl),
    ) {
        cache.put(key, rows.clone(), ttl).await;
    }

    Ok(apply_fetch_hook(ctx, view, rows))
}

/// Stored-entry key: the page-independent routing key plus the page
/// state the fetched rows actually cover.
fn entry_key(routing: &str, selector: &Selector) -> String {
    match (selector.effective_limit(), selector.effective_offset()) {
        (None, None) => routing.to_string(),
        (limit, offset) => format!(
            "{routing}#limit={}:offset={}",
            limit.unwrap_or(0),
            offset.unwrap_or(0)
        ),
    }
}

/// Apply the after-fetch hook to each row as it comes off the wire (or
/// out of the cache). Rows reach the collector later, in
/// [`complete_view`].
fn apply_fetch_hook(ctx: &ReadContext, view: &View, rows: Vec<Row>) -> Vec<Row> {
    let Some(hooks) = &ctx.engine.hooks else {
        return rows;
    };
    let mut hooked = Vec::with_capacity(rows.len());
    for mut row in rows {
        hooks.on_fetch(view, &mut row);
        hooked.push(row);
    }
    hooked
}

async fn execute_matcher(ctx: &ReadContext, view: &View, matcher: &Matcher) -> Result<Vec<Row>> {
    let connection = ctx.engine.source.connection();
    let started = Instant::now();

    let result = match connection.query(&matcher.sql, &matcher.args).await {
        Ok(stream) => stream.collect().await,
        Err(err) => Err(err),
    };

    let metric = FetchMetric {
        view: view.name.clone(),
        elapsed: started.elapsed(),
        rows: result.as_ref().map(|r| r.len() as u64).unwrap_or(0),
        success: result.is_ok(),
    };
    ctx.engine.metrics.record_fetch(metric.clone());
    ctx.stats.lock().expect("stats poisoned").fetches.push(metric);

    result
}

/// Issue the view's meta/count probe concurrently with the main fetch,
/// when the view declares a summary fragment.
async fn summary_probe(
    ctx: &ReadContext,
    view: &View,
    selector: &Selector,
    batch: Option<&BatchData>,
    relation: Option<&Relation>,
) -> Result<()> {
    let Some(summary) = &view.summary else {
        return Ok(());
    };

    // The probe reads the summary fragment with the same batch/selector
    // context as the main fetch, minus pagination and projection. The
    // fragment owns its own column shape.
    let mut probe_view = view.clone();
    probe_view.source = ViewSource::Fragment(summary.clone());
    probe_view.columns = vec![viewgate_core::schema::Column::new("*")];
    probe_view.summary = None;
    probe_view.relations = Vec::new();
    probe_view.cache = None;
    probe_view.order_by = None;

    let mut probe_selector = selector.clone();
    probe_selector.fields = Vec::new();
    probe_selector.order_by = None;

    let unit = DataUnit::new();
    let matcher = build(
        &probe_view,
        &probe_selector,
        batch,
        relation,
        Exclusions::cache_key(),
        ctx.engine.source.dialect(),
        &unit,
    )?;

    let connection = ctx.engine.source.connection();
    let rows = connection
        .query(&matcher.sql, &matcher.args)
        .await?
        .collect()
        .await?;
    ctx.collector.summary(view, rows);

    Ok(())
}

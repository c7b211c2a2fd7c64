use pretty_assertions::assert_eq;

use viewgate_core::{
    driver::Dialect,
    schema::{CacheConfig, Cardinality, Column, Link, Partition, Relation, View},
    selector::Selector,
    stmt::Value,
};
use viewgate_sql::{build, BatchData, DataUnit, Exclusions};

fn events_view() -> View {
    View::new("events", "events").with_columns(vec![
        Column::new("id"),
        Column::new("quantity"),
        Column::new("user_id"),
    ])
}

fn build_sql(view: &View, selector: &Selector) -> String {
    let unit = DataUnit::new();
    build(
        view,
        selector,
        None,
        None,
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap()
    .sql
}

#[test]
fn projection_limit_offset() {
    let view = events_view();
    let mut selector = Selector::new();
    selector.set_fields(["id", "quantity"]);
    selector.limit = Some(2);
    selector.offset = Some(1);

    assert_eq!(
        build_sql(&view, &selector),
        "SELECT id, quantity FROM events LIMIT 2 OFFSET 1"
    );
}

#[test]
fn default_projection_selects_every_declared_column() {
    let view = events_view();
    let selector = Selector::new();

    assert_eq!(
        build_sql(&view, &selector),
        "SELECT id, quantity, user_id FROM events"
    );
}

#[test]
fn offset_zero_is_omitted() {
    let view = events_view();
    let mut selector = Selector::new();
    selector.limit = Some(10);
    selector.offset = Some(0);

    let sql = build_sql(&view, &selector);
    assert!(sql.contains("LIMIT 10"));
    assert!(!sql.contains("OFFSET"));
}

#[test]
fn pagination_exclusion_strips_limit_and_offset() {
    let view = events_view();
    let mut selector = Selector::new();
    selector.limit = Some(10);
    selector.offset = Some(5);

    let unit = DataUnit::new();
    let matcher = build(
        &view,
        &selector,
        None,
        None,
        Exclusions::cache_key(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();

    assert!(!matcher.sql.contains("LIMIT"));
    assert!(!matcher.sql.contains("OFFSET"));
}

#[test]
fn criteria_and_batch_compose_in_where() {
    let view = events_view();
    let mut selector = Selector::new();
    selector.set_criteria("quantity > ?", vec![Value::I64(10)]);

    let batch = BatchData::new(
        vec!["user_id".into()],
        vec![vec![Value::I64(1)], vec![Value::I64(2)]],
    );

    let unit = DataUnit::new();
    let matcher = build(
        &view,
        &selector,
        Some(&batch),
        None,
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();

    assert_eq!(
        matcher.sql,
        "SELECT id, quantity, user_id FROM events WHERE (quantity > ?) AND user_id IN (?, ?)"
    );
    assert_eq!(
        matcher.args,
        vec![Value::I64(10), Value::I64(1), Value::I64(2)]
    );
    // The evaluation scratchpad saw the same arguments in the same order.
    assert_eq!(unit.args_snapshot(), matcher.args);
}

#[test]
fn composite_batch_key_uses_column_tuples() {
    let view = events_view();
    let selector = Selector::new();

    let batch = BatchData::new(
        vec!["user_id".into(), "id".into()],
        vec![
            vec![Value::I64(1), Value::I64(10)],
            vec![Value::I64(2), Value::I64(20)],
        ],
    );

    let unit = DataUnit::new();
    let matcher = build(
        &view,
        &selector,
        Some(&batch),
        None,
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();

    assert!(matcher
        .sql
        .ends_with("WHERE (user_id, id) IN ((?, ?), (?, ?))"));
    assert_eq!(matcher.args.len(), 4);
}

#[test]
fn probe_shape_is_stable_across_batches() {
    let view = events_view();
    let selector = Selector::new();

    let small = BatchData::new(vec!["user_id".into()], vec![vec![Value::I64(1)]]);
    let large = BatchData::new(
        vec!["user_id".into()],
        (0..50).map(|i| vec![Value::I64(i)]).collect(),
    );

    let unit = DataUnit::new();
    let probe_small = build(
        &view,
        &selector,
        Some(&small),
        None,
        Exclusions::probe(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();
    let probe_large = build(
        &view,
        &selector,
        Some(&large),
        None,
        Exclusions::probe(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();

    assert_eq!(probe_small.sql, probe_large.sql);
    assert!(probe_small.sql.contains("user_id IN (?)"));
    assert!(probe_small.args.is_empty());
}

#[test]
fn relation_link_column_is_appended_once() {
    let child = View::new("events", "events")
        .with_columns(vec![Column::new("id"), Column::new("user_id")]);
    let relation = Relation::new(
        "events",
        Cardinality::OneToMany,
        vec![Link::new("id", "user_id")],
        child.clone(),
    );

    // Not projected: appended.
    let mut selector = Selector::new();
    selector.set_fields(["id"]);
    let unit = DataUnit::new();
    let matcher = build(
        &child,
        &selector,
        None,
        Some(&relation),
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();
    assert_eq!(matcher.sql, "SELECT id, user_id FROM events");

    // Already projected: not duplicated.
    selector.set_fields(["user_id"]);
    let matcher = build(
        &child,
        &selector,
        None,
        Some(&relation),
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();
    assert_eq!(matcher.sql, "SELECT user_id FROM events");
}

#[test]
fn order_by_validates_and_passes_ordinals() {
    let view = events_view().with_order_by("id");
    let selector = Selector::new();
    assert!(build_sql(&view, &selector).ends_with("ORDER BY id"));

    // Request-level order-by overrides the view default.
    let mut selector = Selector::new();
    selector.order_by = Some("quantity DESC, 2".into());
    assert!(build_sql(&view, &selector).ends_with("ORDER BY quantity DESC, 2"));

    // Unknown columns fail with view context.
    let mut selector = Selector::new();
    selector.order_by = Some("nope".into());
    let unit = DataUnit::new();
    let err = build(
        &view,
        &selector,
        None,
        None,
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "unknown column `nope` on view `events`");
}

#[test]
fn partition_predicate_and_table_override() {
    let view = events_view().with_partition(
        Partition::new("tenant_id = ?", vec![Value::I64(9)]).with_table("events_shard_9"),
    );
    let selector = Selector::new();

    let unit = DataUnit::new();
    let matcher = build(
        &view,
        &selector,
        None,
        None,
        Exclusions::none(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap();

    assert_eq!(
        matcher.sql,
        "SELECT id, quantity, user_id FROM events_shard_9 WHERE (tenant_id = ?)"
    );
    assert_eq!(matcher.args, vec![Value::I64(9)]);
}

#[test]
fn numbered_placeholders_for_postgresql() {
    let view = events_view();
    let mut selector = Selector::new();
    selector.set_criteria("quantity > ? AND user_id = ?", vec![Value::I64(1), Value::I64(2)]);

    let unit = DataUnit::new();
    let matcher = build(
        &view,
        &selector,
        None,
        None,
        Exclusions::none(),
        &Dialect::POSTGRESQL,
        &unit,
    )
    .unwrap();

    assert!(matcher.sql.contains("quantity > $1 AND user_id = $2"));
}

#[test]
fn template_source_wraps_fragment() {
    let view = View::new("totals", viewgate_core::schema::Source::Fragment(
        "SELECT user_id, SUM(quantity) AS total FROM events GROUP BY user_id".into(),
    ))
    .with_columns(vec![Column::new("user_id"), Column::new("total")]);

    let selector = Selector::new();
    assert_eq!(
        build_sql(&view, &selector),
        "SELECT user_id, total FROM (SELECT user_id, SUM(quantity) AS total FROM events GROUP BY user_id) AS totals"
    );
}

#[test]
fn cache_key_is_page_independent() {
    let view = events_view().with_cache(CacheConfig::new(
        "events",
        std::time::Duration::from_secs(60),
    ));

    let mut page_one = Selector::new();
    page_one.limit = Some(10);
    let mut page_two = Selector::new();
    page_two.limit = Some(10);
    page_two.offset = Some(10);

    let unit = DataUnit::new();
    let key_one = build(
        &view,
        &page_one,
        None,
        None,
        Exclusions::cache_key(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap()
    .cache_key;
    let key_two = build(
        &view,
        &page_two,
        None,
        None,
        Exclusions::cache_key(),
        &Dialect::SQLITE,
        &unit,
    )
    .unwrap()
    .cache_key;

    assert!(key_one.is_some());
    assert_eq!(key_one, key_two);
}

use crate::{BatchData, DataUnit, Matcher};

use viewgate_core::{
    driver::{Dialect, Placeholder},
    schema::{Relation, Source, View},
    selector::Selector,
    stmt::Value,
    Error, Result,
};

/// Which parts of the query to leave out.
///
/// The two flags are independent and give one build function three query
/// shapes: the full fetch, the page-independent cache-routing key, and
/// the summary/count probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exclusions {
    /// Leave the parent-batch IN-clause un-expanded: a stable one
    /// placeholder pattern with no bound arguments, usable only for
    /// cache-namespace derivation.
    pub columns_in: bool,

    /// Leave out LIMIT/OFFSET regardless of selector state.
    pub pagination: bool,
}

impl Exclusions {
    /// Full fetch: nothing excluded.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cache-routing key: page-independent, batch-dependent.
    pub fn cache_key() -> Self {
        Self {
            columns_in: false,
            pagination: true,
        }
    }

    /// Summary/count probe: both excluded; the IN-clause degenerates to
    /// a stable placeholder pattern.
    pub fn probe() -> Self {
        Self {
            columns_in: true,
            pagination: true,
        }
    }
}

/// Build the parameterized SELECT for one view fetch.
///
/// Pure with respect to the database: nothing is executed. Emitted
/// arguments are appended to `unit` in placeholder order and returned on
/// the matcher.
pub fn build(
    view: &View,
    selector: &Selector,
    batch: Option<&BatchData>,
    relation: Option<&Relation>,
    exclusions: Exclusions,
    dialect: &Dialect,
    unit: &DataUnit,
) -> Result<Matcher> {
    selector.validate(view)?;

    let mut sql = String::with_capacity(256);
    let mut args: Vec<Value> = Vec::new();

    sql.push_str("SELECT ");
    push_select_list(&mut sql, view, selector, relation)?;

    sql.push_str(" FROM ");
    push_from(&mut sql, view);

    let mut predicates: Vec<String> = Vec::new();

    if let Some(criteria) = &selector.criteria {
        predicates.push(format!("({})", criteria.expression));
        args.extend(criteria.placeholders.iter().cloned());
    }

    if let Some(batch) = batch {
        if !batch.is_empty() {
            predicates.push(batch_predicate(batch, exclusions, &mut args));
        }
    }

    if let Some(partition) = &view.partition {
        let expected = partition.placeholder_count();
        if partition.placeholders.len() != expected {
            tracing::warn!(
                view = %view.name,
                expected,
                got = partition.placeholders.len(),
                "partition placeholder count mismatch"
            );
        }
        predicates.push(format!("({})", partition.expression));
        args.extend(
            partition
                .placeholders
                .iter()
                .take(expected)
                .cloned(),
        );
    }

    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(order_by) = order_by_clause(view, selector)? {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by);
    }

    if !exclusions.pagination {
        if let Some(limit) = selector.effective_limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
            match selector.effective_offset() {
                Some(offset) if offset > 0 => sql.push_str(&format!(" OFFSET {offset}")),
                _ => {}
            }
        }
    }

    let sql = render_placeholders(&sql, dialect);

    unit.push_args(&args);

    let cache_key = view.cache.as_ref().map(|cache| {
        let mut key = format!("{}:{}", cache.namespace, sql);
        for arg in &args {
            key.push_str(&format!("|{arg:?}"));
        }
        key
    });

    let (batch_offset, batch_len) = batch
        .map(|b| (b.offset(), b.len()))
        .unwrap_or((0, 0));

    Ok(Matcher {
        sql,
        args,
        cache_key,
        batch_offset,
        batch_len,
    })
}

fn push_select_list(
    sql: &mut String,
    view: &View,
    selector: &Selector,
    relation: Option<&Relation>,
) -> Result<()> {
    let mut emitted: Vec<&str> = Vec::new();
    let mut first = true;

    let mut push = |sql: &mut String, fragment: String| {
        if !first {
            sql.push_str(", ");
        }
        first = false;
        sql.push_str(&fragment);
    };

    if selector.fields.is_empty() {
        for column in &view.columns {
            push(sql, column.select_fragment());
            emitted.push(&column.name);
        }
    } else {
        for field in &selector.fields {
            let column = view.column(field)?;
            push(sql, column.select_fragment());
            emitted.push(&column.name);
        }
    }

    // The relation's link columns must come back with the rows so the
    // parent/child merge can key on them. Template sources are assumed
    // to project their own link columns.
    if let Some(relation) = relation {
        if !view.source.is_template() {
            for link in &relation.on {
                let name = link.child_column.as_str();
                if emitted.contains(&name) {
                    continue;
                }
                let fragment = match view.column(name) {
                    Ok(column) => column.select_fragment(),
                    Err(_) => name.to_string(),
                };
                push(sql, fragment);
                emitted.push(name);
            }
        }
    }

    Ok(())
}

fn push_from(sql: &mut String, view: &View) {
    match &view.source {
        Source::Table(_) => {
            // Partition overrides swap the physical table.
            let table = view.physical_table().unwrap_or(&view.name);
            sql.push_str(table);
            if let Some(alias) = &view.alias {
                sql.push_str(" AS ");
                sql.push_str(alias);
            }
        }
        Source::Fragment(fragment) => {
            sql.push('(');
            sql.push_str(fragment);
            if let Some(hint) = &view.discovery_hint {
                sql.push(' ');
                sql.push_str(hint);
            }
            sql.push_str(") AS ");
            sql.push_str(view.alias.as_deref().unwrap_or(&view.name));
        }
    }
}

fn batch_predicate(batch: &BatchData, exclusions: Exclusions, args: &mut Vec<Value>) -> String {
    let columns = batch.columns();

    let column_ref = if columns.len() == 1 {
        columns[0].clone()
    } else {
        format!("({})", columns.join(", "))
    };

    if exclusions.columns_in {
        // Mock expansion: a stable placeholder pattern independent of the
        // batch contents, suitable only for cache-namespace derivation.
        return format!("{column_ref} IN (?)");
    }

    let tuple = if columns.len() == 1 {
        "?".to_string()
    } else {
        let marks = vec!["?"; columns.len()];
        format!("({})", marks.join(", "))
    };
    let list = vec![tuple; batch.len()].join(", ");

    args.extend(batch.args());
    format!("{column_ref} IN ({list})")
}

fn order_by_clause(view: &View, selector: &Selector) -> Result<Option<String>> {
    let raw = selector
        .order_by
        .as_deref()
        .or(view.order_by.as_deref());

    let Some(raw) = raw else { return Ok(None) };

    let mut parts = Vec::new();
    for chunk in raw.split(',') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }

        let mut tokens = chunk.split_whitespace();
        let column = tokens.next().unwrap_or_default();
        let direction = tokens.next();

        if let Some(extra) = tokens.next() {
            return Err(Error::invalid_selector(
                &view.name,
                format!("unexpected order-by token `{extra}`"),
            ));
        }

        // Purely numeric tokens are positional ordinals; they need no
        // column lookup.
        if !column.chars().all(|c| c.is_ascii_digit()) {
            view.column(column)?;
        }

        match direction {
            None => parts.push(column.to_string()),
            Some(dir) if dir.eq_ignore_ascii_case("asc") || dir.eq_ignore_ascii_case("desc") => {
                parts.push(format!("{column} {}", dir.to_uppercase()));
            }
            Some(dir) => {
                return Err(Error::invalid_selector(
                    &view.name,
                    format!("invalid order-by direction `{dir}`"),
                ));
            }
        }
    }

    Ok(if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    })
}

/// Rewrite `?` placeholders into the dialect's flavor. Numbered dialects
/// get `$1..$n` in argument order.
pub fn render_placeholders(sql: &str, dialect: &Dialect) -> String {
    if dialect.placeholder == Placeholder::Question {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut position = 0;
    for ch in sql.chars() {
        if ch == '?' {
            position += 1;
            out.push_str(&dialect.placeholder.render(position));
        } else {
            out.push(ch);
        }
    }
    out
}

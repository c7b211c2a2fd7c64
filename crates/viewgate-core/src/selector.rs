use crate::{schema::View, stmt::Value, Error, Result};

/// Criteria expression attached to a selector: SQL text with `?`
/// placeholders plus the values bound to them.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pub expression: String,
    pub placeholders: Vec<Value>,
}

impl Criteria {
    pub fn new(expression: impl Into<String>, placeholders: Vec<Value>) -> Self {
        Self {
            expression: expression.into(),
            placeholders,
        }
    }
}

/// Per-request, per-view mutable read state.
///
/// Created once per session per view, mutated during the population
/// phase, read during build. Facet validation against the view's
/// constraint flags happens at build time via [`Selector::validate`].
#[derive(Debug, Clone, Default)]
pub struct Selector {
    /// Explicit projection; empty means every declared column.
    pub fields: Vec<String>,

    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub page: Option<u64>,

    pub order_by: Option<String>,

    pub criteria: Option<Criteria>,

    /// When set, the orchestrator skips this view's subtree entirely.
    pub ignored: bool,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
    }

    pub fn set_criteria(&mut self, expression: impl Into<String>, placeholders: Vec<Value>) {
        self.criteria = Some(Criteria::new(expression, placeholders));
    }

    /// Effective limit, resolving paging. A page implies the view's page
    /// size is carried in `limit`.
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Effective offset: explicit offset, or page * limit when paging.
    pub fn effective_offset(&self) -> Option<u64> {
        match (self.offset, self.page, self.limit) {
            (Some(offset), _, _) => Some(offset),
            (None, Some(page), Some(limit)) if page > 0 => Some(page * limit),
            _ => None,
        }
    }

    /// Check every populated facet against the view's constraint flags.
    ///
    /// Offset without limit is always invalid, independent of flags.
    pub fn validate(&self, view: &View) -> Result<()> {
        let constraints = &view.constraints;

        if self.offset.is_some() && self.limit.is_none() {
            return Err(Error::invalid_selector(
                &view.name,
                "offset requires a limit",
            ));
        }

        if self.criteria.is_some() && !constraints.criteria {
            return Err(forbidden(view, "criteria"));
        }
        if self.order_by.is_some() && !constraints.order_by {
            return Err(forbidden(view, "order by"));
        }
        if self.limit.is_some() && !constraints.limit {
            return Err(forbidden(view, "limit"));
        }
        if self.offset.is_some() && !constraints.offset {
            return Err(forbidden(view, "offset"));
        }
        if !self.fields.is_empty() && !constraints.projection {
            return Err(forbidden(view, "projection"));
        }
        if self.page.is_some() && !constraints.page {
            return Err(forbidden(view, "page"));
        }

        // Projected fields must exist on the view.
        for field in &self.fields {
            view.column(field)?;
        }

        Ok(())
    }
}

fn forbidden(view: &View, facet: &str) -> Error {
    Error::invalid_selector(&view.name, format!("{facet} is not permitted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, SelectorConstraints};

    fn view() -> View {
        View::new("events", "events")
            .with_columns(vec![Column::new("id"), Column::new("quantity")])
    }

    #[test]
    fn offset_requires_limit() {
        let mut selector = Selector::new();
        selector.offset = Some(10);

        let err = selector.validate(&view()).unwrap_err();
        assert!(err.to_string().contains("offset requires a limit"));

        selector.limit = Some(5);
        selector.validate(&view()).unwrap();
    }

    #[test]
    fn constraint_flags_are_enforced() {
        let view = view().with_constraints(SelectorConstraints {
            limit: true,
            ..SelectorConstraints::NONE
        });

        let mut selector = Selector::new();
        selector.limit = Some(5);
        selector.validate(&view).unwrap();

        selector.order_by = Some("id".into());
        assert!(selector.validate(&view).is_err());
    }

    #[test]
    fn page_translates_to_offset() {
        let mut selector = Selector::new();
        selector.limit = Some(25);
        selector.page = Some(3);

        assert_eq!(selector.effective_offset(), Some(75));
        assert_eq!(selector.effective_limit(), Some(25));
    }

    #[test]
    fn unknown_projected_column() {
        let mut selector = Selector::new();
        selector.set_fields(["id", "missing"]);

        let err = selector.validate(&view()).unwrap_err();
        assert!(err.to_string().contains("unknown column `missing`"));
    }
}

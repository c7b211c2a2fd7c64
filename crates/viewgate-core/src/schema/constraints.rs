/// Which selector facets a view permits its clients to populate.
///
/// Every flag defaults to off; a view opts facets in explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorConstraints {
    pub criteria: bool,
    pub order_by: bool,
    pub limit: bool,
    pub offset: bool,
    pub projection: bool,
    pub page: bool,
}

impl SelectorConstraints {
    /// Permit every facet.
    pub const ALL: Self = Self {
        criteria: true,
        order_by: true,
        limit: true,
        offset: true,
        projection: true,
        page: true,
    };

    pub const NONE: Self = Self {
        criteria: false,
        order_by: false,
        limit: false,
        offset: false,
        projection: false,
        page: false,
    };
}

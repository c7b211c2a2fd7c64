/// Where a view's rows come from: a plain table or an evaluated SQL
/// fragment produced by the (external) templating subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Table(String),

    /// Already-evaluated template text, used verbatim as the FROM source
    /// (wrapped in parentheses and aliased by the builder).
    Fragment(String),
}

impl Source {
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Fragment(_))
    }

    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::Table(name) => Some(name),
            Self::Fragment(_) => None,
        }
    }
}

impl From<&str> for Source {
    fn from(table: &str) -> Self {
        Self::Table(table.to_string())
    }
}

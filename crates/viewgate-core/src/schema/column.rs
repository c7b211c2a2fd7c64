/// A column declared by a view: its public name plus the SQL expression
/// that produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name the column is addressed by in selectors and results.
    pub name: String,

    /// SQL expression selecting the column. Defaults to the name itself.
    pub expression: String,

    /// Optional alias emitted after the expression.
    pub alias: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            expression: name.clone(),
            name,
            alias: None,
        }
    }

    pub fn with_expression(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            alias: None,
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

/// The SELECT-list fragment for this column.
    pub fn select_fragment(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expression, alias),
            None if self.expression != self.name => {
                format!("{} AS {}", self.expression, self.name)
            }
            None => self.expression.clone(),
        }
    }
}

use viewgate_core::stmt::Value;

/// One expansion result: an optional column reference, an SQL fragment
/// with `?` placeholders, and the arguments bound to them in emission
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Column (or parenthesised column tuple) the fragment applies to.
    pub column: Option<String>,

    /// SQL fragment with `?` placeholders.
    pub fragment: String,

    /// Arguments, ordered to match the fragment's placeholders.
    pub args: Vec<Value>,
}

impl Expression {
    pub fn new(
        column: impl Into<String>,
        fragment: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            column: Some(column.into()),
            fragment: fragment.into(),
            args,
        }
    }

    pub fn fragment(fragment: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            column: None,
            fragment: fragment.into(),
            args,
        }
    }
}

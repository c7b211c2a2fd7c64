use super::View;

/// Parent/child link cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

/// How a relation's subtree is scheduled relative to its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Child branches run fully concurrently and join at a barrier before
    /// the parent completes.
    #[default]
    FullMatch,

    /// Siblings still run concurrently, but the parent's "fetched"
    /// notification is gated until all children finish.
    Ordered,
}

/// One join-column pair of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Column on the parent view holding the key.
    pub parent_column: String,

    /// Column on the child view matched against it.
    pub child_column: String,
}

impl Link {
    pub fn new(parent_column: impl Into<String>, child_column: impl Into<String>) -> Self {
        Self {
            parent_column: parent_column.into(),
            child_column: child_column.into(),
        }
    }
}

/// A parent/child relation between two views.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub cardinality: Cardinality,
    pub strategy: MatchStrategy,
    pub on: Vec<Link>,
    pub child: View,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        cardinality: Cardinality,
        on: Vec<Link>,
        child: View,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality,
            strategy: MatchStrategy::default(),
            on,
            child,
        }
    }

    pub fn ordered(mut self) -> Self {
        self.strategy = MatchStrategy::Ordered;
        self
    }

    /// Parent-side key columns, in link order.
    pub fn parent_columns(&self) -> Vec<&str> {
        self.on.iter().map(|l| l.parent_column.as_str()).collect()
    }

    /// Child-side key columns, in link order.
    pub fn child_columns(&self) -> Vec<&str> {
        self.on.iter().map(|l| l.child_column.as_str()).collect()
    }
}

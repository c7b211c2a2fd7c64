/// Placeholder flavor emitted into generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` for every argument (MySQL, SQLite).
    Question,

    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

impl Placeholder {
    /// Render the placeholder for the 1-based argument position.
    pub fn render(&self, position: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Numbered => format!("${position}"),
        }
    }
}

/// Describes the SQL dialect of a logical source, which informs the
/// builder and the statement executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub placeholder: Placeholder,

    /// Whether one INSERT statement may carry multiple VALUES tuples.
    pub multi_row_insert: bool,

    /// Upper bound on rows per multi-row INSERT statement.
    pub insert_batch_cap: usize,
}

impl Dialect {
    /// SQLite dialect.
    pub const SQLITE: Self = Self {
        placeholder: Placeholder::Question,
        multi_row_insert: true,
        insert_batch_cap: 100,
    };

    /// PostgreSQL dialect.
    pub const POSTGRESQL: Self = Self {
        placeholder: Placeholder::Numbered,
        ..Self::SQLITE
    };

    /// MySQL dialect.
    pub const MYSQL: Self = Self {
        placeholder: Placeholder::Question,
        ..Self::SQLITE
    };

    pub fn with_insert_batch_cap(mut self, cap: usize) -> Self {
        self.insert_batch_cap = cap;
        self
    }

    pub fn without_multi_row_insert(mut self) -> Self {
        self.multi_row_insert = false;
        self
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::SQLITE
    }
}

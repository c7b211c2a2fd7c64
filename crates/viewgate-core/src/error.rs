use std::sync::Arc;

/// Return early with an [`Error`] built from the given format arguments.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Create an [`Error`] from the given format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur anywhere in the viewgate engine.
///
/// Errors are values: every failure path in the engine returns one of
/// these with enough context (view, column, table, SQL when permitted)
/// for client-facing rendering.
#[derive(Clone)]
pub struct Error {
    inner: Arc<ErrorKind>,
}

#[derive(Debug)]
enum ErrorKind {
    /// A column referenced by a projection, order-by, or relation link is
    /// not declared by the view.
    UnknownColumn { view: String, column: String },

    /// A selector facet was populated that the view's constraint flags do
    /// not permit, or the facet combination is invalid.
    InvalidSelector { view: String, detail: String },

    /// A criteria type declares more selectable columns than the presence
    /// bitmask can distinguish.
    TooManyCriteriaColumns { ty: &'static str, count: usize },

    /// A filter or binder was handed a value shape it cannot expand.
    UnsupportedFilterValue { detail: String },

    /// Reported by a driver. `connection_lost` marks the transient subset
    /// that the statement executor may retry once.
    Driver {
        detail: String,
        connection_lost: bool,
    },

    /// The enclosing call was cancelled before the database call finished.
    Cancelled,

    /// A view's evaluated SQL fragment is unusable.
    InvalidTemplate { view: String, detail: String },

    /// Freeform error message with no dedicated kind.
    Adhoc(String),
}

impl Error {
    pub fn unknown_column(view: impl Into<String>, column: impl Into<String>) -> Self {
        ErrorKind::UnknownColumn {
            view: view.into(),
            column: column.into(),
        }
        .into()
    }

    pub fn invalid_selector(view: impl Into<String>, detail: impl Into<String>) -> Self {
        ErrorKind::InvalidSelector {
            view: view.into(),
            detail: detail.into(),
        }
        .into()
    }

    pub fn too_many_criteria_columns(ty: &'static str, count: usize) -> Self {
        ErrorKind::TooManyCriteriaColumns { ty, count }.into()
    }

    pub fn unsupported_filter_value(detail: impl Into<String>) -> Self {
        ErrorKind::UnsupportedFilterValue {
            detail: detail.into(),
        }
        .into()
    }

    pub fn driver(detail: impl Into<String>) -> Self {
        ErrorKind::Driver {
            detail: detail.into(),
            connection_lost: false,
        }
        .into()
    }

    /// A driver error for a dropped or invalid connection.
    pub fn connection_lost(detail: impl Into<String>) -> Self {
        ErrorKind::Driver {
            detail: detail.into(),
            connection_lost: true,
        }
        .into()
    }

    pub fn cancelled() -> Self {
        ErrorKind::Cancelled.into()
    }

    pub fn invalid_template(view: impl Into<String>, detail: impl Into<String>) -> Self {
        ErrorKind::InvalidTemplate {
            view: view.into(),
            detail: detail.into(),
        }
        .into()
    }

    #[doc(hidden)]
    pub fn from_args(args: core::fmt::Arguments<'_>) -> Self {
        ErrorKind::Adhoc(args.to_string()).into()
    }

    /// True when the error is the transient dropped-connection kind that
    /// the statement executor retries once.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            &*self.inner,
            ErrorKind::Driver {
                connection_lost: true,
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.inner, ErrorKind::Cancelled)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Arc::new(kind),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match &*self.inner {
            UnknownColumn { view, column } => {
                write!(f, "unknown column `{column}` on view `{view}`")
            }
            InvalidSelector { view, detail } => {
                write!(f, "invalid selector for view `{view}`: {detail}")
            }
            TooManyCriteriaColumns { ty, count } => {
                write!(f, "criteria type `{ty}` declares {count} selectable columns; at most 63 are supported")
            }
            UnsupportedFilterValue { detail } => {
                write!(f, "unsupported filter value: {detail}")
            }
            Driver { detail, .. } => write!(f, "driver error: {detail}"),
            Cancelled => f.write_str("operation cancelled"),
            InvalidTemplate { view, detail } => {
                write!(f, "invalid template for view `{view}`: {detail}")
            }
            Adhoc(msg) => f.write_str(msg),
        }
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if f.alternate() {
            f.debug_struct("Error").field("kind", &self.inner).finish()
        } else {
            core::fmt::Display::fmt(self, f)
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        // One word, same as the Arc it wraps.
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn connection_lost_classification() {
        assert!(Error::connection_lost("socket closed").is_connection_lost());
        assert!(!Error::driver("syntax error").is_connection_lost());
        assert!(!Error::cancelled().is_connection_lost());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::unknown_column("events", "quantityy");
        assert_eq!(
            err.to_string(),
            "unknown column `quantityy` on view `events`"
        );
    }
}

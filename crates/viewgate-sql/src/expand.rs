mod criteria;
pub use criteria::{Criteria, CriteriaColumn, ExpanderRegistry, Group, MAX_CRITERIA_COLUMNS};

mod expression;
pub use expression::Expression;

pub mod ops;

use crate::DataUnit;
use viewgate_core::{stmt::Value, Error, Result};

/// Expand a runtime value into a placeholder fragment plus its ordered
/// arguments, appending the arguments to the enclosing [`DataUnit`].
///
/// This is the single canonical expansion entry point: scalars become one
/// placeholder (the value is copied, so later mutation of the source
/// cannot corrupt bound arguments); lists expand each element and join
/// the fragments with `", "`. Criteria structs go through
/// [`ExpanderRegistry::expand`] instead.
pub fn expand_value(value: &Value, unit: &DataUnit) -> Result<Expression> {
    let expr = expand_value_detached(value)?;
    unit.push_args(&expr.args);
    Ok(expr)
}

/// [`expand_value`] without the DataUnit side effect. Used where the
/// caller owns argument accounting (the builder's probe shapes).
pub fn expand_value_detached(value: &Value) -> Result<Expression> {
    match value {
        Value::List(items) => {
            let mut fragments = Vec::with_capacity(items.len());
            let mut args = Vec::with_capacity(items.len());
            for item in items {
                if item.is_list() {
                    return Err(Error::unsupported_filter_value(
                        "nested lists cannot be bound",
                    ));
                }
                let inner = expand_value_detached(item)?;
                fragments.push(inner.fragment);
                args.extend(inner.args);
            }
            Ok(Expression::fragment(fragments.join(", "), args))
        }
        scalar => Ok(Expression::fragment("?", vec![scalar.clone()])),
    }
}

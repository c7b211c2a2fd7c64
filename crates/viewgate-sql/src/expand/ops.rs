//! Filter operators built on the expander: IN / NOT IN / LIKE / CONTAINS
//! over plain column value lists and over criteria-grouped structs.
//!
//! Inclusive operators OR their groups; exclusive operators AND them.
//! Empty input sets degenerate to the sentinels `1 = 0` (inclusive: match
//! nothing) and `0 = 0` (exclusive: exclude nothing) so generated SQL
//! stays syntactically valid.

use super::{expand_value, Criteria, ExpanderRegistry, Expression};
use crate::DataUnit;
use viewgate_core::{stmt::Value, Error, Result};

/// Matches nothing. Emitted for an inclusive filter over an empty set.
pub const MATCH_NONE: &str = "1 = 0";

/// Excludes nothing. Emitted for an exclusive filter over an empty set.
pub const MATCH_ALL: &str = "0 = 0";

/// `column IN (?, ...)` over a plain value list.
pub fn in_column(column: &str, values: &[Value], unit: &DataUnit) -> Result<Expression> {
    if values.is_empty() {
        return Ok(Expression::new(column, MATCH_NONE, vec![]));
    }
    let list = expand_value(&Value::List(values.to_vec()), unit)?;
    Ok(Expression::new(
        column,
        format!("{column} IN ({})", list.fragment),
        list.args,
    ))
}

/// `column NOT IN (?, ...)` over a plain value list.
pub fn not_in_column(column: &str, values: &[Value], unit: &DataUnit) -> Result<Expression> {
    if values.is_empty() {
        return Ok(Expression::new(column, MATCH_ALL, vec![]));
    }
    let list = expand_value(&Value::List(values.to_vec()), unit)?;
    Ok(Expression::new(
        column,
        format!("{column} NOT IN ({})", list.fragment),
        list.args,
    ))
}

/// Criteria IN: one `(cols) IN (tuples)` clause per presence-bitmask
/// group, OR'd together.
pub fn in_criteria<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    let groups = registry.group(items)?;
    if groups.is_empty() {
        return Ok(Expression::fragment(MATCH_NONE, vec![]));
    }

    let mut clauses = Vec::with_capacity(groups.len());
    let mut args = Vec::new();
    for group in &groups {
        let group_args = group.args();
        unit.push_args(&group_args);
        clauses.push(format!(
            "{} IN ({})",
            group.column_tuple(),
            group.placeholder_list()
        ));
        args.extend(group_args);
    }

    Ok(Expression::fragment(clauses.join(" OR "), args))
}

/// Criteria NOT IN: one `(cols) NOT IN (tuples)` clause per group, AND'd.
pub fn not_in_criteria<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    let groups = registry.group(items)?;
    if groups.is_empty() {
        return Ok(Expression::fragment(MATCH_ALL, vec![]));
    }

    let mut clauses = Vec::with_capacity(groups.len());
    let mut args = Vec::new();
    for group in &groups {
        let group_args = group.args();
        unit.push_args(&group_args);
        clauses.push(format!(
            "{} NOT IN ({})",
            group.column_tuple(),
            group.placeholder_list()
        ));
        args.extend(group_args);
    }

    Ok(Expression::fragment(clauses.join(" AND "), args))
}

/// Criteria LIKE: per group, per instance, `col LIKE ?` across the set
/// fields; instances OR'd.
pub fn like<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    pattern_match(registry, items, unit, false, |value| Ok(value))
}

/// Negated [`like`]: clauses are AND'd and wrapped in `NOT (...)`.
pub fn not_like<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    pattern_match(registry, items, unit, true, Ok)
}

/// Criteria substring match: values are wrapped in `%...%` and compared
/// case-insensitively.
pub fn contains<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    pattern_match(registry, items, unit, false, substring_pattern)
}

/// Negated [`contains`].
pub fn not_contains<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
) -> Result<Expression> {
    pattern_match(registry, items, unit, true, substring_pattern)
}

fn pattern_match<T: Criteria>(
    registry: &ExpanderRegistry,
    items: &[T],
    unit: &DataUnit,
    exclusive: bool,
    wrap: impl Fn(Value) -> Result<Value>,
) -> Result<Expression> {
    let groups = registry.group(items)?;
    if groups.is_empty() {
        let sentinel = if exclusive { MATCH_ALL } else { MATCH_NONE };
        return Ok(Expression::fragment(sentinel, vec![]));
    }

    let mut clauses = Vec::new();
    let mut args = Vec::new();
    for group in &groups {
        for tuple in &group.tuples {
            let mut parts = Vec::with_capacity(tuple.len());
            for (column, value) in group.columns.iter().zip(tuple) {
                // Case folding is per value: only string comparisons get
                // LOWER'd, even within one mixed-type instance.
                let case_fold = matches!(value, Value::String(_));
                let arg = wrap(value.clone())?;
                let col = match column.alias {
                    Some(alias) => format!("{alias}.{}", column.column),
                    None => column.column.to_string(),
                };
                if case_fold {
                    parts.push(format!("LOWER({col}) LIKE LOWER(?)"));
                } else {
                    parts.push(format!("{col} LIKE ?"));
                }
                unit.push_args(std::slice::from_ref(&arg));
                args.push(arg);
            }
            let clause = if parts.len() == 1 {
                parts.remove(0)
            } else {
                format!("({})", parts.join(" AND "))
            };
            clauses.push(clause);
        }
    }

    let joined = clauses.join(" OR ");
    let fragment = if exclusive {
        format!("NOT ({joined})")
    } else {
        joined
    };

    Ok(Expression::fragment(fragment, args))
}

fn substring_pattern(value: Value) -> Result<Value> {
    let text = match &value {
        Value::String(s) => s.clone(),
        Value::I64(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        other => {
            return Err(Error::unsupported_filter_value(format!(
                "cannot build a substring pattern from {other:?}"
            )))
        }
    };
    Ok(Value::String(format!("%{text}%")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::CriteriaColumn;

    #[test]
    fn empty_in_is_match_none() {
        let unit = DataUnit::new();
        let expr = in_column("user_id", &[], &unit).unwrap();
        assert_eq!(expr.fragment, "1 = 0");
        assert!(expr.args.is_empty());
    }

    #[test]
    fn empty_not_in_is_match_all() {
        let unit = DataUnit::new();
        let expr = not_in_column("anything", &[], &unit).unwrap();
        assert_eq!(expr.fragment, "0 = 0");
    }

    #[test]
    fn in_column_expands_values() {
        let unit = DataUnit::new();
        let values = [Value::I64(1), Value::I64(2)];
        let expr = in_column("user_id", &values, &unit).unwrap();

        assert_eq!(expr.fragment, "user_id IN (?, ?)");
        assert_eq!(expr.args, values);
        assert_eq!(unit.args_snapshot(), values);
    }

    struct EventCriteria {
        user_id: Option<i64>,
        quantity: Option<f64>,
    }

    impl Criteria for EventCriteria {
        fn columns() -> &'static [CriteriaColumn] {
            const COLUMNS: &[CriteriaColumn] = &[
                CriteriaColumn::new("user_id", "user_id"),
                CriteriaColumn::new("quantity", "quantity"),
            ];
            COLUMNS
        }

        fn value(&self, index: usize) -> Option<Value> {
            match index {
                0 => self.user_id.map(Value::from),
                1 => self.quantity.map(Value::from),
                _ => None,
            }
        }
    }

    #[test]
    fn criteria_in_ors_groups() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();

        let items = [
            EventCriteria {
                user_id: Some(1),
                quantity: None,
            },
            EventCriteria {
                user_id: Some(2),
                quantity: Some(5.0),
            },
        ];

        let expr = in_criteria(&registry, &items, &unit).unwrap();
        assert_eq!(
            expr.fragment,
            "(user_id) IN (?) OR (user_id, quantity) IN ((?, ?))"
        );
        assert_eq!(
            expr.args,
            vec![Value::I64(1), Value::I64(2), Value::F64(5.0)]
        );
    }

    #[test]
    fn criteria_not_in_ands_groups() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();

        let items = [
            EventCriteria {
                user_id: Some(1),
                quantity: None,
            },
            EventCriteria {
                user_id: None,
                quantity: Some(2.0),
            },
        ];

        let expr = not_in_criteria(&registry, &items, &unit).unwrap();
        assert_eq!(
            expr.fragment,
            "(user_id) NOT IN (?) AND (quantity) NOT IN (?)"
        );
    }

    struct NameCriteria {
        name: Option<String>,
    }

    impl Criteria for NameCriteria {
        fn columns() -> &'static [CriteriaColumn] {
            const COLUMNS: &[CriteriaColumn] = &[CriteriaColumn::new("name", "name")];
            COLUMNS
        }

        fn value(&self, index: usize) -> Option<Value> {
            match index {
                0 => self.name.clone().map(Value::from),
                _ => None,
            }
        }
    }

    #[test]
    fn contains_wraps_and_folds_case() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();

        let items = [NameCriteria {
            name: Some("ada".into()),
        }];

        let expr = contains(&registry, &items, &unit).unwrap();
        assert_eq!(expr.fragment, "LOWER(name) LIKE LOWER(?)");
        assert_eq!(expr.args, vec![Value::String("%ada%".into())]);
    }

    struct MixedCriteria {
        name: Option<String>,
        quantity: Option<i64>,
    }

    impl Criteria for MixedCriteria {
        fn columns() -> &'static [CriteriaColumn] {
            const COLUMNS: &[CriteriaColumn] = &[
                CriteriaColumn::new("name", "name"),
                CriteriaColumn::new("quantity", "quantity"),
            ];
            COLUMNS
        }

        fn value(&self, index: usize) -> Option<Value> {
            match index {
                0 => self.name.clone().map(Value::from),
                1 => self.quantity.map(Value::from),
                _ => None,
            }
        }
    }

    #[test]
    fn case_folding_is_per_value() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();

        let items = [MixedCriteria {
            name: Some("Ada".into()),
            quantity: Some(5),
        }];

        // Only the string comparison folds case; the numeric one stays
        // bare even though it shares the instance.
        let expr = contains(&registry, &items, &unit).unwrap();
        assert_eq!(
            expr.fragment,
            "(LOWER(name) LIKE LOWER(?) AND quantity LIKE ?)"
        );
        assert_eq!(
            expr.args,
            vec![Value::String("%Ada%".into()), Value::String("%5%".into())]
        );
    }

    #[test]
    fn empty_criteria_like_uses_sentinel() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();
        let items: [NameCriteria; 0] = [];

        let expr = like(&registry, &items, &unit).unwrap();
        assert_eq!(expr.fragment, "1 = 0");

        let expr = not_like(&registry, &items, &unit).unwrap();
        assert_eq!(expr.fragment, "0 = 0");
    }
}

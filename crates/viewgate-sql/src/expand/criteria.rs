use super::Expression;
use crate::DataUnit;
use viewgate_core::{stmt::Value, Error, Result};

use indexmap::IndexMap;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Bitmask width: at most this many distinguishable criteria columns per
/// type.
pub const MAX_CRITERIA_COLUMNS: usize = 63;

/// One selectable column of a criteria type: the field it reads, the SQL
/// column it filters, and an optional alias qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaColumn {
    /// Field name, for diagnostics.
    pub field: &'static str,

    /// SQL column name the field filters on.
    pub column: &'static str,

    /// Optional table alias prefixed to the column.
    pub alias: Option<&'static str>,
}

impl CriteriaColumn {
    pub const fn new(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            alias: None,
        }
    }

    pub const fn aliased(field: &'static str, column: &'static str, alias: &'static str) -> Self {
        Self {
            field,
            column,
            alias: Some(alias),
        }
    }

    fn qualified(&self) -> String {
        match self.alias {
            Some(alias) => format!("{alias}.{}", self.column),
            None => self.column.to_string(),
        }
    }
}

/// A struct usable as a batched filter: it declares its selectable
/// columns once and reports, per instance, which fields are set.
///
/// `value(i)` returns `None` when field `i` is absent (nil) on this
/// instance; absent fields do not participate in grouping. Ordinarily
/// implemented by generated code; tests implement it by hand.
pub trait Criteria: Send + Sync + 'static {
    /// Column descriptors, one per selectable field, in field order.
    fn columns() -> &'static [CriteriaColumn]
    where
        Self: Sized;

    /// The bound value of field `index`, or `None` when the field is not
    /// set on this instance.
    fn value(&self, index: usize) -> Option<Value>;
}

/// Per-type column descriptor, validated once and cached for the
/// registry's lifetime.
#[derive(Debug)]
pub struct TypeSchema {
    pub type_name: &'static str,
    pub columns: &'static [CriteriaColumn],
}

/// One presence-bitmask group: every instance in `tuples` sets exactly
/// the fields named by `columns`.
#[derive(Debug, PartialEq)]
pub struct Group {
    pub mask: u64,
    pub columns: Vec<CriteriaColumn>,

    /// Per instance, the values of the set fields, in field order.
    pub tuples: Vec<Vec<Value>>,
}

impl Group {
    /// `(a, b)` for multi-column groups, the bare column for one.
    pub fn column_tuple(&self) -> String {
        if self.columns.len() == 1 {
            format!("({})", self.columns[0].qualified())
        } else {
            let cols: Vec<_> = self.columns.iter().map(|c| c.qualified()).collect();
            format!("({})", cols.join(", "))
        }
    }

    /// Placeholder tuple list: `?, ?` for single-column groups,
    /// `(?, ?), (?, ?)` otherwise.
    pub fn placeholder_list(&self) -> String {
        let one = if self.columns.len() == 1 {
            "?".to_string()
        } else {
            let marks = vec!["?"; self.columns.len()];
            format!("({})", marks.join(", "))
        };
        vec![one; self.tuples.len()].join(", ")
    }

    /// Arguments in emission order: per tuple, per set field.
    pub fn args(&self) -> Vec<Value> {
        self.tuples.iter().flatten().cloned().collect()
    }
}

/// Lock-guarded, read-mostly cache of per-type criteria descriptors.
///
/// Owned by the engine instance (cloned handles share the map); never a
/// process-global, so tests stay hermetic. Descriptor validation — the
/// 63-column bitmask limit — runs once per type.
#[derive(Debug, Default, Clone)]
pub struct ExpanderRegistry {
    inner: Arc<RwLock<HashMap<TypeId, Arc<TypeSchema>>>>,
}

impl ExpanderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `T`, built and validated on first use.
    pub fn schema_of<T: Criteria>(&self) -> Result<Arc<TypeSchema>> {
        let id = TypeId::of::<T>();

        if let Some(schema) = self.inner.read().expect("registry poisoned").get(&id) {
            return Ok(schema.clone());
        }

        let columns = T::columns();
        if columns.len() > MAX_CRITERIA_COLUMNS {
            return Err(Error::too_many_criteria_columns(
                std::any::type_name::<T>(),
                columns.len(),
            ));
        }

        let schema = Arc::new(TypeSchema {
            type_name: std::any::type_name::<T>(),
            columns,
        });

        self.inner
            .write()
            .expect("registry poisoned")
            .entry(id)
            .or_insert_with(|| schema.clone());
        Ok(schema)
    }

    /// Group `items` by presence bitmask, preserving first-seen group
    /// order. Instances with an all-zero mask are dropped: they carry no
    /// predicate.
    pub fn group<T: Criteria>(&self, items: &[T]) -> Result<Vec<Group>> {
        let schema = self.schema_of::<T>()?;

        let mut groups: IndexMap<u64, Group> = IndexMap::new();

        for item in items {
            let mut mask = 0u64;
            let mut tuple = Vec::new();

            for (index, _) in schema.columns.iter().enumerate() {
                if let Some(value) = item.value(index) {
                    mask |= 1 << index;
                    tuple.push(value);
                }
            }

            if mask == 0 {
                continue;
            }

            groups
                .entry(mask)
                .or_insert_with(|| Group {
                    mask,
                    columns: schema
                        .columns
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, c)| c.clone())
                        .collect(),
                    tuples: Vec::new(),
                })
                .tuples
                .push(tuple);
        }

        Ok(groups.into_values().collect())
    }

    /// Expand `items` into one expression per distinct presence bitmask,
    /// appending every bound argument to `unit` in emission order.
    pub fn expand<T: Criteria>(&self, items: &[T], unit: &DataUnit) -> Result<Vec<Expression>> {
        let groups = self.group(items)?;

        let mut expressions = Vec::with_capacity(groups.len());
        for group in &groups {
            let args = group.args();
            unit.push_args(&args);
            expressions.push(Expression {
                column: Some(group.column_tuple()),
                fragment: format!("({})", group.placeholder_list()),
                args,
            });
        }

        Ok(expressions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn groups_by_presence_mask() {
        let registry = ExpanderRegistry::new();

        let items = [
            EventCriteria {
                user_id: Some(1),
                quantity: None,
            },
            EventCriteria {
                user_id: Some(2),
                quantity: Some(3.5),
            },
            EventCriteria {
                user_id: Some(4),
                quantity: None,
            },
        ];

        let groups = registry.group(&items).unwrap();
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].mask, 0b01);
        assert_eq!(groups[0].column_tuple(), "(user_id)");
        assert_eq!(groups[0].placeholder_list(), "?, ?");
        assert_eq!(groups[0].args(), vec![Value::I64(1), Value::I64(4)]);

        assert_eq!(groups[1].mask, 0b11);
        assert_eq!(groups[1].column_tuple(), "(user_id, quantity)");
        assert_eq!(groups[1].placeholder_list(), "(?, ?)");
        assert_eq!(groups[1].args(), vec![Value::I64(2), Value::F64(3.5)]);
    }

    #[test]
    fn all_zero_mask_is_dropped() {
        let registry = ExpanderRegistry::new();

        let items = [EventCriteria {
            user_id: None,
            quantity: None,
        }];

        assert!(registry.group(&items).unwrap().is_empty());
    }

    #[test]
    fn expansion_appends_args_in_emission_order() {
        let registry = ExpanderRegistry::new();
        let unit = DataUnit::new();

        let items = [
            EventCriteria {
                user_id: Some(7),
                quantity: Some(1.0),
            },
            EventCriteria {
                user_id: Some(8),
                quantity: None,
            },
        ];

        let exprs = registry.expand(&items, &unit).unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(
            unit.args_snapshot(),
            vec![Value::I64(7), Value::F64(1.0), Value::I64(8)]
        );
    }

    #[test]
    fn too_many_columns_fails_at_construction() {
        struct Wide;

        impl Criteria for Wide {
            fn columns() -> &'static [CriteriaColumn] {
                const COLUMNS: [CriteriaColumn; 64] = [CriteriaColumn::new("f", "c"); 64];
                &COLUMNS
            }

            fn value(&self, _index: usize) -> Option<Value> {
                None
            }
        }

        let registry = ExpanderRegistry::new();
        let err = registry.schema_of::<Wide>().unwrap_err();
        assert!(err.to_string().contains("at most 63"));
    }
}

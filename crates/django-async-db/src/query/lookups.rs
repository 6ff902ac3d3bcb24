//! Field lookups used by query filters.

use std::cmp::Ordering;

use crate::value::Value;

/// A comparison applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOp {
    Exact(Value),
    /// Case-insensitive string equality.
    IExact(String),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Substring match on string fields.
    Contains(String),
    In(Vec<Value>),
}

/// A filter on one field, optionally negated.
///
/// ```
/// use django_async_db::query::Lookup;
/// use django_async_db::value::Value;
///
/// let lookup = Lookup::gte("pages", 100);
/// assert!(lookup.matches(&Value::Int(120)));
/// assert!(!lookup.negate().matches(&Value::Int(120)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub field: String,
    pub op: LookupOp,
    pub negated: bool,
}

fn same(a: &Value, b: &Value) -> bool {
    a == b || a.partial_cmp(b) == Some(Ordering::Equal)
}

impl Lookup {
    pub fn new(field: impl Into<String>, op: LookupOp) -> Self {
        Self {
            field: field.into(),
            op,
            negated: false,
        }
    }

    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, LookupOp::Exact(value.into()))
    }

    pub fn iexact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, LookupOp::IExact(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, LookupOp::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, LookupOp::Gte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, LookupOp::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, LookupOp::Lte(value.into()))
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(field, LookupOp::Contains(needle.into()))
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, LookupOp::In(values))
    }

    /// Inverts the lookup.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Tests a field value against this lookup.
    pub fn matches(&self, value: &Value) -> bool {
        let hit = match &self.op {
            LookupOp::Exact(expected) => same(value, expected),
            LookupOp::IExact(expected) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase() == expected.to_lowercase()),
            LookupOp::Gt(bound) => value.partial_cmp(bound) == Some(Ordering::Greater),
            LookupOp::Gte(bound) => matches!(
                value.partial_cmp(bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            LookupOp::Lt(bound) => value.partial_cmp(bound) == Some(Ordering::Less),
            LookupOp::Lte(bound) => matches!(
                value.partial_cmp(bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            LookupOp::Contains(needle) => value.as_str().is_some_and(|s| s.contains(needle.as_str())),
            LookupOp::In(values) => values.iter().any(|v| same(value, v)),
        };
        hit != self.negated
    }
}

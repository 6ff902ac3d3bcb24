//! Query description and lazy query sets.
//!
//! A [`Query`] is plain data: filters, ordering and a slice window. A
//! [`QuerySet`] pairs a query with the backend that will run it, and only
//! touches the backend when a terminal method is awaited.

pub mod lookups;
pub mod queryset;

pub use lookups::{Lookup, LookupOp};
pub use queryset::{DatePeriod, Manager, QuerySet};

use std::cmp::Ordering;

use crate::model::Model;
use crate::value::Value;

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Parses `"name"` or `"-name"`.
    pub fn parse(term: &str) -> Self {
        term.strip_prefix('-')
            .map_or_else(|| Self::asc(term), Self::desc)
    }
}

/// The data a backend needs to run a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// All filters must match.
    pub filters: Vec<Lookup>,
    pub ordering: Vec<OrderBy>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn matches<M: Model>(&self, instance: &M) -> bool {
        self.filters.iter().all(|lookup| {
            let value = instance.field_value(&lookup.field).unwrap_or(Value::Null);
            lookup.matches(&value)
        })
    }

    /// Compares two instances under this query's ordering.
    pub fn compare<M: Model>(&self, a: &M, b: &M) -> Ordering {
        for order in &self.ordering {
            let left = a.field_value(&order.column).unwrap_or(Value::Null);
            let right = b.field_value(&order.column).unwrap_or(Value::Null);
            let ord = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
            let ord = if order.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Filters, sorts and slices `rows` in memory.
    pub fn apply<M: Model>(&self, rows: impl IntoIterator<Item = M>) -> Vec<M> {
        let mut matched: Vec<M> = rows.into_iter().filter(|m| self.matches(m)).collect();
        matched.sort_by(|a, b| self.compare(a, b));
        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(self.offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_parse() {
        assert_eq!(OrderBy::parse("name"), OrderBy::asc("name"));
        assert_eq!(OrderBy::parse("-pub_date"), OrderBy::desc("pub_date"));
    }
}

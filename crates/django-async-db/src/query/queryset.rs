//! Lazy query sets and the model manager.
//!
//! Builder methods (`filter`, `order_by`, `slice`, ...) only edit the
//! [`Query`]. Each terminal method performs exactly one backend call.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use django_async_core::{DjangoError, DjangoResult};

use super::{Lookup, OrderBy, Query};
use crate::backend::ModelBackend;
use crate::model::Model;
use crate::value::Value;

/// `get()` stops reading after this many rows.
const MAX_GET_RESULTS: usize = 21;

/// Granularity for [`QuerySet::dates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePeriod {
    Year,
    Month,
    Day,
}

impl DatePeriod {
    fn truncate(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            Self::Day => Some(date),
        }
    }
}

/// A lazy query over one model.
pub struct QuerySet<M: Model> {
    backend: Arc<dyn ModelBackend<M>>,
    query: Query,
}

impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            query: self.query.clone(),
        }
    }
}

impl<M: Model> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &M::meta().object_name)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<M: Model> QuerySet<M> {
    pub fn new(backend: Arc<dyn ModelBackend<M>>) -> Self {
        Self {
            backend,
            query: Query::default(),
        }
    }

    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns a manager over the same backend.
    pub fn manager(&self) -> Manager<M> {
        Manager::new(Arc::clone(&self.backend))
    }

    // ── Builders (lazy) ──────────────────────────────────────────────

    #[must_use]
    pub fn filter(mut self, lookup: Lookup) -> Self {
        self.query.filters.push(lookup);
        self
    }

    #[must_use]
    pub fn exclude(self, lookup: Lookup) -> Self {
        self.filter(lookup.negate())
    }

    /// Excludes the instance with primary key `pk`.
    #[must_use]
    pub fn exclude_pk(self, pk: impl Into<Value>) -> Self {
        self.exclude(Lookup::exact(M::pk_field_name(), pk))
    }

    /// A query set that matches nothing.
    #[must_use]
    pub fn none(self) -> Self {
        self.filter(Lookup::is_in(M::pk_field_name(), Vec::new()))
    }

    /// Replaces the ordering. Terms use the `"-field"` convention.
    #[must_use]
    pub fn order_by<S: AsRef<str>>(mut self, terms: &[S]) -> Self {
        self.query.ordering = terms.iter().map(|t| OrderBy::parse(t.as_ref())).collect();
        self
    }

    /// Restricts to rows `[start, end)` of the current result, composing
    /// with any earlier slice.
    #[must_use]
    pub fn slice(mut self, start: usize, end: Option<usize>) -> Self {
        let limit = match (self.query.limit, end) {
            (Some(l), Some(e)) => Some(e.min(l).saturating_sub(start)),
            (Some(l), None) => Some(l.saturating_sub(start)),
            (None, Some(e)) => Some(e.saturating_sub(start)),
            (None, None) => None,
        };
        self.query.offset += start;
        self.query.limit = limit;
        self
    }

    /// Returns `true` if the query or the model declares an ordering.
    pub fn is_ordered(&self) -> bool {
        !self.query.ordering.is_empty() || !M::meta().ordering.is_empty()
    }

    fn effective_query(&self) -> Query {
        let mut query = self.query.clone();
        if query.ordering.is_empty() {
            query.ordering.clone_from(&M::meta().ordering);
        }
        query
    }

    // ── Terminal methods ─────────────────────────────────────────────

    pub async fn count(&self) -> DjangoResult<usize> {
        self.backend.count(&self.effective_query()).await
    }

    pub async fn fetch_all(&self) -> DjangoResult<Vec<M>> {
        self.backend.fetch(&self.effective_query()).await
    }

    /// Returns the single matching instance.
    pub async fn get(&self) -> DjangoResult<M> {
        let meta = M::meta();
        let mut rows = self
            .clone()
            .slice(0, Some(MAX_GET_RESULTS))
            .fetch_all()
            .await?;
        match rows.len() {
            0 => Err(DjangoError::DoesNotExist(format!(
                "{} matching query does not exist.",
                meta.object_name
            ))),
            1 => Ok(rows.remove(0)),
            n => {
                let count = if n >= MAX_GET_RESULTS {
                    format!("more than {}", MAX_GET_RESULTS - 1)
                } else {
                    n.to_string()
                };
                Err(DjangoError::MultipleObjectsReturned(format!(
                    "get() returned more than one {} -- it returned {count}!",
                    meta.object_name
                )))
            }
        }
    }

    /// Returns the first instance, ordering by primary key when unordered.
    pub async fn first(&self) -> DjangoResult<Option<M>> {
        let qs = if self.is_ordered() {
            self.clone()
        } else {
            self.clone().order_by(&[M::pk_field_name()])
        };
        Ok(qs.slice(0, Some(1)).fetch_all().await?.into_iter().next())
    }

    pub async fn exists(&self) -> DjangoResult<bool> {
        Ok(self.clone().slice(0, Some(1)).count().await? > 0)
    }

    /// Deletes every matching row.
    pub async fn delete(&self) -> DjangoResult<usize> {
        self.backend.delete(&self.query).await
    }

    /// Returns the distinct dates of `field`, truncated to `period`.
    pub async fn dates(
        &self,
        field: &str,
        period: DatePeriod,
        descending: bool,
    ) -> DjangoResult<Vec<NaiveDate>> {
        let rows = self.fetch_all().await?;
        let set: BTreeSet<NaiveDate> = rows
            .iter()
            .filter_map(|m| m.field_value(field))
            .filter_map(|v| v.as_date())
            .filter_map(|d| period.truncate(d))
            .collect();
        let mut dates: Vec<NaiveDate> = set.into_iter().collect();
        if descending {
            dates.reverse();
        }
        Ok(dates)
    }
}

/// Model-level operations, the equivalent of `Model.objects`.
pub struct Manager<M: Model> {
    backend: Arc<dyn ModelBackend<M>>,
}

impl<M: Model> Clone for Manager<M> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<M: Model> fmt::Debug for Manager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("model", &M::meta().object_name)
            .finish_non_exhaustive()
    }
}

impl<M: Model> Manager<M> {
    pub fn new(backend: Arc<dyn ModelBackend<M>>) -> Self {
        Self { backend }
    }

    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new(Arc::clone(&self.backend))
    }

    pub fn filter(&self, lookup: Lookup) -> QuerySet<M> {
        self.all().filter(lookup)
    }

    pub async fn get(&self, lookup: Lookup) -> DjangoResult<M> {
        self.filter(lookup).get().await
    }

    /// Inserts a new instance and returns it with its primary key set.
    pub async fn create(&self, instance: M) -> DjangoResult<M> {
        self.backend.insert(instance).await
    }

    /// Updates an existing instance, or inserts it if it has no primary
    /// key or no stored row.
    pub async fn save(&self, instance: M) -> DjangoResult<M> {
        if instance.pk().map_or(true, |v| v.is_null()) {
            return self.backend.insert(instance).await;
        }
        if self.backend.update(&instance).await? {
            Ok(instance)
        } else {
            self.backend.insert(instance).await
        }
    }

    /// Deletes a saved instance.
    pub async fn delete(&self, instance: &M) -> DjangoResult<usize> {
        let meta = M::meta();
        let pk = instance.pk().filter(|v| !v.is_null()).ok_or_else(|| {
            DjangoError::ValueError(format!(
                "{} object can't be deleted because its {} attribute is set to None.",
                meta.object_name,
                M::pk_field_name()
            ))
        })?;
        self.backend
            .delete(&Query {
                filters: vec![Lookup::exact(M::pk_field_name(), pk)],
                ..Query::default()
            })
            .await
    }
}

//! Sequences that can be counted and windowed asynchronously.
//!
//! The paginator and list views accept any [`ObjectList`]: a lazy
//! [`QuerySet`] or a plain `Vec`. A query set turns `count` and
//! `fetch_range` into backend calls; a `Vec` answers from memory.

use async_trait::async_trait;
use django_async_core::DjangoResult;
use serde::Serialize;

use crate::model::{Model, ModelMeta};
use crate::query::QuerySet;

#[async_trait]
pub trait ObjectList: Clone + Send + Sync + 'static {
    type Item: Serialize + Clone + Send + Sync + 'static;

    /// Returns the total number of items.
    async fn count(&self) -> DjangoResult<usize>;

    /// Returns items `[start, end)`, clamped to the available range.
    async fn fetch_range(&self, start: usize, end: usize) -> DjangoResult<Vec<Self::Item>>;

    /// Returns every item.
    async fn fetch_all(&self) -> DjangoResult<Vec<Self::Item>>;

    /// Metadata of the underlying model, when there is one.
    fn model_meta(&self) -> Option<&'static ModelMeta> {
        None
    }

    /// Whether iteration order is well defined.
    fn is_ordered(&self) -> bool {
        true
    }

    /// Returns a copy ordered by `terms` (`"-field"` for descending).
    #[must_use]
    fn with_ordering(&self, terms: &[String]) -> Self;
}

#[async_trait]
impl<M: Model> ObjectList for QuerySet<M> {
    type Item = M;

    async fn count(&self) -> DjangoResult<usize> {
        Self::count(self).await
    }

    async fn fetch_range(&self, start: usize, end: usize) -> DjangoResult<Vec<M>> {
        self.clone().slice(start, Some(end)).fetch_all().await
    }

    async fn fetch_all(&self) -> DjangoResult<Vec<M>> {
        Self::fetch_all(self).await
    }

    fn model_meta(&self) -> Option<&'static ModelMeta> {
        Some(M::meta())
    }

    fn is_ordered(&self) -> bool {
        Self::is_ordered(self)
    }

    fn with_ordering(&self, terms: &[String]) -> Self {
        self.clone().order_by(terms)
    }
}

#[async_trait]
impl<T> ObjectList for Vec<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn count(&self) -> DjangoResult<usize> {
        Ok(self.len())
    }

    async fn fetch_range(&self, start: usize, end: usize) -> DjangoResult<Vec<T>> {
        let end = end.min(self.len());
        let start = start.min(end);
        Ok(self[start..end].to_vec())
    }

    async fn fetch_all(&self) -> DjangoResult<Vec<T>> {
        Ok(self.clone())
    }

    /// A `Vec` keeps its own order; reordering is the caller's job.
    fn with_ordering(&self, _terms: &[String]) -> Self {
        self.clone()
    }
}

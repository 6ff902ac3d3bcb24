//! The async storage seam.
//!
//! [`ModelBackend`] is the only place a [`QuerySet`](crate::query::QuerySet)
//! or [`Manager`](crate::query::Manager) touches storage. Real deployments
//! implement it over a database driver; [`InMemoryBackend`] keeps rows in
//! a `tokio::sync::RwLock` and counts every operation so tests can assert
//! how many queries a view performed.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult};
use tokio::sync::RwLock;

use crate::model::Model;
use crate::query::Query;
use crate::value::Value;

/// Executes queries for one model type.
#[async_trait]
pub trait ModelBackend<M: Model>: Send + Sync {
    /// Counts the rows the query selects, honoring its slice window.
    async fn count(&self, query: &Query) -> DjangoResult<usize>;

    /// Fetches the rows the query selects.
    async fn fetch(&self, query: &Query) -> DjangoResult<Vec<M>>;

    /// Inserts `instance`, assigning a primary key if it has none.
    async fn insert(&self, instance: M) -> DjangoResult<M>;

    /// Updates the row with the same primary key. Returns `false` when no
    /// such row exists.
    async fn update(&self, instance: &M) -> DjangoResult<bool>;

    /// Deletes the rows the query selects and returns how many were removed.
    async fn delete(&self, query: &Query) -> DjangoResult<usize>;
}

/// Access to a backend's operation counter.
pub trait QueryCounter: Send + Sync {
    fn query_count(&self) -> usize;
    fn reset_query_count(&self);
}

/// A [`ModelBackend`] over an in-process `Vec`.
#[derive(Debug)]
pub struct InMemoryBackend<M: Model> {
    rows: RwLock<Vec<M>>,
    next_id: AtomicI64,
    queries: AtomicUsize,
}

impl<M: Model> Default for InMemoryBackend<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> InMemoryBackend<M> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            queries: AtomicUsize::new(0),
        }
    }

    fn record(&self, op: &'static str) {
        let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(model = M::meta().object_name, op, n, "in-memory query");
    }

    /// Returns a snapshot of every stored row without counting a query.
    pub async fn snapshot(&self) -> Vec<M> {
        self.rows.read().await.clone()
    }
}

impl<M: Model> QueryCounter for InMemoryBackend<M> {
    fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn reset_query_count(&self) {
        self.queries.store(0, Ordering::SeqCst);
    }
}

fn pk_matches<M: Model>(row: &M, pk: &Value) -> bool {
    row.pk().as_ref() == Some(pk)
}

#[async_trait]
impl<M: Model> ModelBackend<M> for InMemoryBackend<M> {
    async fn count(&self, query: &Query) -> DjangoResult<usize> {
        self.record("count");
        let rows = self.rows.read().await;
        Ok(query.apply(rows.iter().cloned()).len())
    }

    async fn fetch(&self, query: &Query) -> DjangoResult<Vec<M>> {
        self.record("fetch");
        let rows = self.rows.read().await;
        Ok(query.apply(rows.iter().cloned()))
    }

    async fn insert(&self, mut instance: M) -> DjangoResult<M> {
        self.record("insert");
        let mut rows = self.rows.write().await;
        match instance.pk() {
            Some(Value::Int(id)) => {
                if rows.iter().any(|r| pk_matches(r, &Value::Int(id))) {
                    return Err(DjangoError::DatabaseError(format!(
                        "UNIQUE constraint failed: {}.{}",
                        M::meta().label_lower(),
                        M::pk_field_name()
                    )));
                }
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
            }
            Some(Value::Null) | None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                instance.set_pk(Value::Int(id));
            }
            Some(_) => {}
        }
        rows.push(instance.clone());
        Ok(instance)
    }

    async fn update(&self, instance: &M) -> DjangoResult<bool> {
        self.record("update");
        let Some(pk) = instance.pk() else {
            return Ok(false);
        };
        let mut rows = self.rows.write().await;
        if let Some(index) = rows.iter().position(|r| pk_matches(r, &pk)) {
            rows[index] = instance.clone();
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete(&self, query: &Query) -> DjangoResult<usize> {
        self.record("delete");
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }
}

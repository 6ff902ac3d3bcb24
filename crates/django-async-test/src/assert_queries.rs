//! Query counting assertions.
//!
//! [`assert_num_queries`] counts the backend operations run by an async
//! closure and checks the total. Any [`QueryCounter`] works, including
//! [`InMemoryBackend`](django_async_db::InMemoryBackend).
//!
//! ## Example
//!
//! ```
//! # use std::sync::Arc;
//! use django_async_db::{InMemoryBackend, Manager};
//! use django_async_test::fixtures::Author;
//! use django_async_test::assert_num_queries;
//!
//! # async fn example() {
//! let backend = Arc::new(InMemoryBackend::<Author>::new());
//! let objects = Manager::new(backend.clone());
//! assert_num_queries(backend.as_ref(), 1, || async {
//!     objects.all().count().await.unwrap();
//! })
//! .await;
//! # }
//! ```

use std::future::Future;

use django_async_db::QueryCounter;

/// Asserts that `f` runs exactly `expected_count` queries.
///
/// # Panics
///
/// Panics when the count differs.
pub async fn assert_num_queries<C, F, Fut>(counter: &C, expected_count: usize, f: F)
where
    C: QueryCounter + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    counter.reset_query_count();
    f().await;
    let actual = counter.query_count();
    assert_eq!(
        actual, expected_count,
        "Expected {expected_count} queries, but {actual} were executed"
    );
}

/// Asserts that `f` runs at most `max_count` queries.
///
/// # Panics
///
/// Panics when more queries run.
pub async fn assert_max_queries<C, F, Fut>(counter: &C, max_count: usize, f: F)
where
    C: QueryCounter + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    counter.reset_query_count();
    f().await;
    let actual = counter.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} queries, but {actual} were executed"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use django_async_db::{InMemoryBackend, Lookup, Manager};

    use super::*;
    use crate::fixtures::Author;

    async fn seeded() -> (Arc<InMemoryBackend<Author>>, Manager<Author>) {
        let backend = Arc::new(InMemoryBackend::new());
        let objects = Manager::new(backend.clone());
        for name in ["Ada", "Grace"] {
            objects.create(Author::new(name)).await.unwrap();
        }
        (backend, objects)
    }

    #[tokio::test]
    async fn test_assert_num_queries_passes() {
        let (backend, objects) = seeded().await;
        assert_num_queries(backend.as_ref(), 2, || async {
            objects.all().count().await.unwrap();
            objects.filter(Lookup::exact("name", "Ada")).fetch_all().await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_num_queries_zero() {
        let (backend, objects) = seeded().await;
        assert_num_queries(backend.as_ref(), 0, || async {
            let _lazy = objects.all().order_by(&["name"]);
        })
        .await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected 1 queries, but 2 were executed")]
    async fn test_assert_num_queries_fails_too_many() {
        let (backend, objects) = seeded().await;
        assert_num_queries(backend.as_ref(), 1, || async {
            objects.all().count().await.unwrap();
            objects.all().count().await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_max_queries_passes() {
        let (backend, objects) = seeded().await;
        assert_max_queries(backend.as_ref(), 3, || async {
            objects.all().exists().await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected at most 0 queries, but 1 were executed")]
    async fn test_assert_max_queries_fails() {
        let (backend, objects) = seeded().await;
        assert_max_queries(backend.as_ref(), 0, || async {
            objects.all().first().await.unwrap();
        })
        .await;
    }
}

//! # django-async
//!
//! Async class-based views, model forms and pagination in the Django style.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `django-async` for the whole stack, or on individual crates for finer
//! control. The `full` feature (on by default) enables everything except
//! the `testing` utilities.
//!
//! ```no_run
//! use django_async::views::{TemplateView, View, ViewApp};
//!
//! # async fn run() -> Result<(), django_async::core::DjangoError> {
//! ViewApp::new()
//!     .route("/", TemplateView::new("home.html").as_view())
//!     .run("127.0.0.1:8000")
//!     .await
//! # }
//! ```

/// Errors, settings and logging.
pub use django_async_core as core;

/// Requests, responses and query dictionaries.
pub use django_async_http as http;

/// Models, query sets, managers and the in-memory backend.
pub use django_async_db as db;

/// Template engine.
#[cfg(feature = "template")]
pub use django_async_template as template;

/// Forms and model forms.
#[cfg(feature = "forms")]
pub use django_async_forms as forms;

/// Class-based views, pagination and the axum server.
#[cfg(feature = "views")]
pub use django_async_views as views;

/// Users, permissions and access mixins.
#[cfg(feature = "auth")]
pub use django_async_auth as auth;

/// Request factory, query assertions and fixtures.
#[cfg(feature = "testing")]
pub use django_async_test as test;

/// Third-party crates used in the public API.
pub use async_trait::async_trait;
pub use axum;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

//! # django-async-test
//!
//! Testing utilities for django-async.
//!
//! - [`request_factory`] - [`RequestFactory`] for dispatching views directly
//! - [`assert_queries`] - [`assert_num_queries`] and [`assert_max_queries`]
//! - [`fixtures`] - small models backed by the in-memory backend

pub mod assert_queries;
pub mod fixtures;
pub mod request_factory;

pub use assert_queries::{assert_max_queries, assert_num_queries};
pub use request_factory::RequestFactory;

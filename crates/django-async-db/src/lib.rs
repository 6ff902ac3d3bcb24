//! # django-async-db
//!
//! The model layer consumed by django-async views and forms. It does not
//! build SQL. Instead it describes queries as data and hands them to a
//! [`ModelBackend`], the seam where a real ORM plugs in.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`] enum
//! - [`fields`] - Field definitions ([`FieldDef`])
//! - [`model`] - The [`Model`] trait and [`ModelMeta`]
//! - [`query`] - Lookups, [`QuerySet`] and [`Manager`]
//! - [`backend`] - The async [`ModelBackend`] seam and [`InMemoryBackend`]
//! - [`object_list`] - [`ObjectList`], shared by query sets and vectors

#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]

pub mod backend;
pub mod fields;
pub mod model;
pub mod object_list;
pub mod query;
pub mod value;

pub use backend::{InMemoryBackend, ModelBackend, QueryCounter};
pub use fields::{FieldDef, FieldType};
pub use model::{interpolate, Model, ModelMeta};
pub use object_list::ObjectList;
pub use query::{DatePeriod, Lookup, LookupOp, Manager, OrderBy, Query, QuerySet};
pub use value::{FromValue, Value};

//! # django-async-views
//!
//! Async class-based views for django-async. Views implement the [`View`]
//! trait, compose behaviour from mixin traits, and are turned into request
//! handlers with [`View::as_view`].
//!
//! ## Module Overview
//!
//! - [`base`] - [`View`], [`ContextMixin`], [`TemplateResponseMixin`],
//!   [`TemplateView`] and [`RedirectView`]
//! - [`pagination`] - [`Paginator`] and [`Page`]
//! - [`list`] - [`MultipleObjectMixin`] and [`ListView`]
//! - [`detail`] - [`SingleObjectMixin`] and [`DetailView`]
//! - [`edit`] - Form views: [`FormView`], [`CreateView`], [`UpdateView`],
//!   [`DeleteView`]
//! - [`dates`] - [`DateArchiveView`] and [`DateDetailView`]
//! - [`server`] - [`ViewApp`], serving views through axum

#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

pub mod base;
pub mod dates;
pub mod detail;
pub mod edit;
pub mod list;
pub mod pagination;
pub mod server;

pub use base::{
    kwargs_context, ContextMixin, RedirectView, TemplateResponseMixin, TemplateView, View,
    ViewFunction, ViewFuture, HTTP_METHOD_NAMES,
};
pub use dates::{ArchivePeriod, DateArchiveView, DateDetailView};
pub use detail::{DetailView, ObjectOptions, SingleObjectMixin};
pub use edit::{
    base_form, CreateView, DeleteView, DeletionMixin, FormFactory, FormKwargs, FormMixin,
    FormView, ModelFormMixin, UpdateView,
};
pub use list::{ListView, MultipleObjectMixin};
pub use pagination::{Page, PageRangeItem, PaginationError, Paginator, ELLIPSIS};
pub use server::ViewApp;

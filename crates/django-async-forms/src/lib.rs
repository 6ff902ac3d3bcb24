//! # django-async-forms
//!
//! Form handling for django-async: typed field cleaning, the async
//! [`Form`] trait with a general-purpose [`BaseForm`], and [`ModelForm`],
//! which generates its fields from model metadata and saves through a
//! [`Manager`](django_async_db::Manager).
//!
//! ## Module Overview
//!
//! - [`fields`] - [`FormFieldDef`], [`FormFieldType`] and [`clean_field_value`]
//! - [`validation`] - Error-accumulating field cleaning
//! - [`form`] - The [`Form`] trait and [`BaseForm`]
//! - [`model_form`] - [`ModelFormConfig`], [`fields_for_model`] and [`ModelForm`]

#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]

pub mod fields;
pub mod form;
pub mod model_form;
pub mod validation;

pub use fields::{clean_field_value, FormFieldDef, FormFieldType};
pub use form::{BaseForm, CleanFn, Form, FormErrors};
pub use model_form::{fields_for_model, ModelForm, ModelFormConfig, ModelFormFields};
pub use validation::NON_FIELD_ERRORS;

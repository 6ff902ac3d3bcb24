//! # django-async-http
//!
//! Request and response types for django-async views. Requests can be
//! built by hand for tests or converted from an axum request; responses
//! convert back into axum responses.

pub mod querydict;
pub mod request;
pub mod response;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponsePermanentRedirect, HttpResponseRedirect};

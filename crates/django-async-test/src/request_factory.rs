//! Request factory for building [`HttpRequest`] objects in tests.
//!
//! [`RequestFactory`] builds requests directly, bypassing routing, so a view
//! can be dispatched in isolation. URL kwargs and the request user, which
//! routing and middleware would normally provide, are set with
//! [`RequestFactory::with_kwargs`] and [`RequestFactory::with_user`].
//!
//! ## Example
//!
//! ```
//! use django_async_test::RequestFactory;
//!
//! let factory = RequestFactory::new();
//! let request = factory.get("/articles/?page=2");
//! assert_eq!(request.method(), &http::Method::GET);
//! assert_eq!(request.path(), "/articles/");
//! assert_eq!(request.get().get("page"), Some("2"));
//! ```

use std::collections::HashMap;

use django_async_auth::{attach_user, AbstractUser, RequestUser};
use django_async_http::{HttpRequest, QueryDict};
use http::Method;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds requests for `testserver`.
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    default_headers: HashMap<String, String>,
    default_meta: HashMap<String, String>,
}

impl RequestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Adds a META entry set on every request.
    #[must_use]
    pub fn with_default_meta(mut self, key: &str, value: &str) -> Self {
        self.default_meta
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, path: &str) -> HttpRequest {
        self.generic(Method::GET, path, Vec::new(), None)
    }

    /// A POST with a form-encoded body.
    pub fn post(&self, path: &str, data: &[(&str, &str)]) -> HttpRequest {
        self.form_request(Method::POST, path, data)
    }

    pub fn post_json(&self, path: &str, json: &serde_json::Value) -> HttpRequest {
        let body = serde_json::to_vec(json).unwrap_or_default();
        self.generic(Method::POST, path, body, Some("application/json"))
    }

    pub fn put(&self, path: &str, data: &[(&str, &str)]) -> HttpRequest {
        self.form_request(Method::PUT, path, data)
    }

    pub fn patch(&self, path: &str, data: &[(&str, &str)]) -> HttpRequest {
        self.form_request(Method::PATCH, path, data)
    }

    pub fn delete(&self, path: &str) -> HttpRequest {
        self.generic(Method::DELETE, path, Vec::new(), None)
    }

    pub fn head(&self, path: &str) -> HttpRequest {
        self.generic(Method::HEAD, path, Vec::new(), None)
    }

    pub fn options(&self, path: &str) -> HttpRequest {
        self.generic(Method::OPTIONS, path, Vec::new(), None)
    }

    pub fn trace(&self, path: &str) -> HttpRequest {
        self.generic(Method::TRACE, path, Vec::new(), None)
    }

    /// Builds a request with any method and body. A `?query` on `path`
    /// becomes the query string.
    pub fn generic(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> HttpRequest {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let mut builder = HttpRequest::builder()
            .method(method)
            .path(path)
            .query_string(query)
            .meta("SERVER_NAME", "testserver")
            .meta("HTTP_HOST", "testserver");

        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        for (key, value) in &self.default_meta {
            builder = builder.meta(key, value);
        }
        if let Some(ct) = content_type {
            builder = builder.content_type(ct);
        }
        builder.body(body).build()
    }

    fn form_request(&self, method: Method, path: &str, data: &[(&str, &str)]) -> HttpRequest {
        let body = QueryDict::from_pairs(data.iter().copied()).urlencode();
        self.generic(method, path, body.into_bytes(), Some(FORM_CONTENT_TYPE))
    }

    /// Sets the URL kwargs routing would have captured.
    #[must_use]
    pub fn with_kwargs(mut request: HttpRequest, kwargs: &[(&str, &str)]) -> HttpRequest {
        request.set_kwargs(
            kwargs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        request
    }

    /// Makes `user` the authenticated user of the request.
    #[must_use]
    pub fn with_user(mut request: HttpRequest, user: AbstractUser) -> HttpRequest {
        attach_user(&mut request, RequestUser::Authenticated(user));
        request
    }
}

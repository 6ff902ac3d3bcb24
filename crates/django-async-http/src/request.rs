//! HTTP request type.
//!
//! [`HttpRequest`] carries what views read from an incoming request: the
//! method, path, headers, GET/POST parameters, the URL kwargs captured by
//! the router, and typed extensions that layers such as authentication use
//! to attach per-request state.

use std::collections::HashMap;

use http::{Extensions, HeaderMap, Method};

use crate::querydict::QueryDict;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request.
///
/// # Examples
///
/// ```
/// use django_async_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/authors/")
///     .query_string("page=2")
///     .kwarg("pk", "7")
///     .build();
///
/// assert_eq!(request.get().get("page"), Some("2"));
/// assert_eq!(request.kwarg("pk"), Some("7"));
/// assert_eq!(request.get_full_path(), "/authors/?page=2");
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
    kwargs: HashMap<String, String>,
    extensions: Extensions,
}

impl HttpRequest {
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Converts an axum request head and its collected body.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let http::request::Parts {
            method,
            uri,
            headers,
            extensions,
            ..
        } = parts;

        let path = uri.path().to_string();
        let query_string = uri.query().unwrap_or("").to_string();

        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut meta = HashMap::new();
        for (name, value) in &headers {
            let meta_key = format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_"));
            if let Ok(v) = value.to_str() {
                meta.insert(meta_key, v.to_string());
            }
        }
        if let Some(host) = headers.get(http::header::HOST).and_then(|v| v.to_str().ok()) {
            meta.insert("SERVER_NAME".to_string(), host.to_string());
        }
        if let Some(ct) = &content_type {
            meta.insert("CONTENT_TYPE".to_string(), ct.clone());
        }
        meta.insert("CONTENT_LENGTH".to_string(), body.len().to_string());

        let scheme = if headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "https")
            || uri.scheme_str() == Some("https")
        {
            "https"
        } else {
            "http"
        };

        HttpRequestBuilder {
            method,
            path,
            query_string,
            content_type,
            headers,
            meta,
            body,
            scheme: scheme.to_string(),
            kwargs: HashMap::new(),
            extensions,
        }
        .build()
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string without the leading `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the query string parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the form-encoded body parameters.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the META dictionary (`HTTP_*` headers, `REQUEST_METHOD`, ...).
    pub const fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.meta
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the URL keyword arguments captured by the router.
    pub const fn kwargs(&self) -> &HashMap<String, String> {
        &self.kwargs
    }

    /// Returns one URL keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }

    pub fn set_kwargs(&mut self, kwargs: HashMap<String, String>) {
        self.kwargs = kwargs;
    }

    /// Typed per-request state, such as the authenticated user.
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns the host from the `Host` header or META.
    pub fn get_host(&self) -> &str {
        self.meta
            .get("HTTP_HOST")
            .or_else(|| self.meta.get("SERVER_NAME"))
            .map_or("localhost", String::as_str)
    }

    /// Returns the path followed by the query string, if any.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Builds an absolute URI for `location`, or for the request itself.
    ///
    /// Absolute locations are returned unchanged.
    pub fn build_absolute_uri(&self, location: Option<&str>) -> String {
        let scheme = &self.scheme;
        let host = self.get_host();
        match location {
            Some(loc) if loc.starts_with("http://") || loc.starts_with("https://") => {
                loc.to_string()
            }
            Some(loc) if loc.starts_with('/') => format!("{scheme}://{host}{loc}"),
            Some(loc) => format!("{scheme}://{host}/{loc}"),
            None => format!("{scheme}://{host}{}", self.get_full_path()),
        }
    }
}

/// Builder for [`HttpRequest`], used by tests and the request factory.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
    kwargs: HashMap<String, String>,
    extensions: Extensions,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            meta: HashMap::new(),
            body: Vec::new(),
            scheme: "http".to_string(),
            kwargs: HashMap::new(),
            extensions: Extensions::new(),
        }
    }
}

impl HttpRequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without the leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    #[must_use]
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a form-encoded body and the matching content type.
    #[must_use]
    pub fn form(mut self, data: &QueryDict) -> Self {
        self.content_type = Some(FORM_URLENCODED.to_string());
        self.body = data.urlencode().into_bytes();
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    #[must_use]
    pub fn kwarg(mut self, name: &str, value: &str) -> Self {
        self.kwargs.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn kwargs(mut self, kwargs: HashMap<String, String>) -> Self {
        self.kwargs.extend(kwargs);
        self
    }

    /// Inserts a typed extension.
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);

        let post = if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED))
        {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        let mut meta = self.meta;
        meta.entry("REQUEST_METHOD".to_string())
            .or_insert_with(|| self.method.to_string());
        meta.entry("PATH_INFO".to_string())
            .or_insert_with(|| self.path.clone());
        meta.entry("QUERY_STRING".to_string())
            .or_insert_with(|| self.query_string.clone());

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            get,
            post,
            headers: self.headers,
            meta,
            body: self.body,
            scheme: self.scheme,
            kwargs: self.kwargs,
            extensions: self.extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let req = HttpRequest::builder().build();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.path(), "/");
        assert_eq!(req.query_string(), "");
        assert!(req.content_type().is_none());
        assert!(req.body().is_empty());
        assert!(req.kwargs().is_empty());
        assert!(!req.is_secure());
        assert_eq!(req.meta().get("REQUEST_METHOD").unwrap(), "GET");
    }

    #[test]
    fn test_builder_form_populates_post() {
        let data = QueryDict::from_pairs([("name", "Ada Lovelace"), ("slug", "ada")]);
        let req = HttpRequest::builder()
            .method(Method::POST)
            .form(&data)
            .build();
        assert_eq!(req.content_type(), Some(FORM_URLENCODED));
        assert_eq!(req.post().get("name"), Some("Ada Lovelace"));
        assert_eq!(req.post().get("slug"), Some("ada"));
        assert!(!req.post().is_mutable());
    }

    #[test]
    fn test_non_form_body_leaves_post_empty() {
        let req = HttpRequest::builder()
            .method(Method::POST)
            .content_type("application/json")
            .body(br#"{"a": 1}"#.to_vec())
            .build();
        assert!(req.post().is_empty());
    }

    #[test]
    fn test_kwargs() {
        let mut req = HttpRequest::builder().kwarg("pk", "3").build();
        assert_eq!(req.kwarg("pk"), Some("3"));
        assert_eq!(req.kwarg("slug"), None);

        req.set_kwargs(HashMap::from([("slug".to_string(), "x".to_string())]));
        assert_eq!(req.kwarg("slug"), Some("x"));
        assert_eq!(req.kwarg("pk"), None);
    }

    #[test]
    fn test_extensions() {
        #[derive(Clone, Debug, PartialEq)]
        struct Marker(u32);

        let mut req = HttpRequest::builder().extension(Marker(1)).build();
        assert_eq!(req.extensions().get::<Marker>(), Some(&Marker(1)));
        req.extensions_mut().insert(Marker(2));
        assert_eq!(req.extensions().get::<Marker>(), Some(&Marker(2)));
    }

    #[test]
    fn test_get_host_default_and_meta() {
        assert_eq!(HttpRequest::builder().build().get_host(), "localhost");
        let req = HttpRequest::builder().meta("HTTP_HOST", "testserver").build();
        assert_eq!(req.get_host(), "testserver");
    }

    #[test]
    fn test_build_absolute_uri() {
        let req = HttpRequest::builder()
            .path("/rand")
            .query_string("a=1")
            .meta("HTTP_HOST", "testserver")
            .build();
        assert_eq!(req.build_absolute_uri(None), "http://testserver/rand?a=1");
        assert_eq!(
            req.build_absolute_uri(Some("/login/")),
            "http://testserver/login/"
        );
        assert_eq!(
            req.build_absolute_uri(Some("login/")),
            "http://testserver/login/"
        );
        assert_eq!(
            req.build_absolute_uri(Some("https://other.example.com/x")),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_from_axum() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/authors/new/?next=%2F")
            .header("host", "example.com")
            .header("content-type", FORM_URLENCODED)
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        let req = HttpRequest::from_axum(parts, b"name=Ada".to_vec());

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.path(), "/authors/new/");
        assert_eq!(req.get().get("next"), Some("/"));
        assert_eq!(req.post().get("name"), Some("Ada"));
        assert_eq!(req.get_host(), "example.com");
        assert!(req.is_secure());
        assert_eq!(req.meta().get("CONTENT_LENGTH").unwrap(), "8");
    }

    #[test]
    fn test_trace_method_is_preserved() {
        let req = HttpRequest::builder().method(Method::TRACE).build();
        assert_eq!(req.method(), &Method::TRACE);
        assert_eq!(req.meta().get("REQUEST_METHOD").unwrap(), "TRACE");
    }
}

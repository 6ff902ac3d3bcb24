//! HTTP response types.
//!
//! [`HttpResponse`] is what every view returns. Template-rendered responses
//! additionally record the candidate template names and the context they
//! were rendered with, so tests can assert on them without parsing HTML.

use std::borrow::Cow;

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

use django_async_core::DjangoError;

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use django_async_http::HttpResponse;
///
/// let response = HttpResponse::ok("Hello, World!");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.text(), "Hello, World!");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: Vec<u8>,
    charset: String,
    content_type: String,
    template_name: Vec<String>,
    context_data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl HttpResponse {
    /// Creates a `text/html` response.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: body.into().into_bytes(),
            charset: "utf-8".to_string(),
            content_type: "text/html".to_string(),
            template_name: Vec::new(),
            context_data: None,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    /// Creates an empty 410 Gone response.
    pub fn gone() -> Self {
        Self::new(StatusCode::GONE, "")
    }

    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a 405 response whose `Allow` header lists `permitted_methods`.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allow = permitted_methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allow}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Converts an error into a response.
    ///
    /// The status comes from [`DjangoError::status_code`]. The body carries
    /// the error message only in debug mode; otherwise it is the canonical
    /// reason phrase. Server errors are logged.
    pub fn from_error(err: &DjangoError, debug: bool) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %err, "View raised an error");
        }
        let body = if debug {
            err.to_string()
        } else {
            status.canonical_reason().unwrap_or("Error").to_string()
        };
        let mut response = Self::new(status, body);
        if !debug {
            response.content_type = "text/plain".to_string();
        }
        response
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Adds a header to the response.
    #[must_use]
    pub fn set_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = charset.into();
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the body decoded as UTF-8 (lossily).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Clears the body, as done for HEAD responses.
    pub fn clear_content(&mut self) {
        self.content.clear();
    }

    /// The template names that were candidates for rendering.
    pub fn template_name(&self) -> &[String] {
        &self.template_name
    }

    /// The context a template response was rendered with.
    pub const fn context_data(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.context_data.as_ref()
    }

    /// Records the template names and context of a rendered response.
    #[must_use]
    pub fn with_template(
        mut self,
        template_name: Vec<String>,
        context_data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.template_name = template_name;
        self.context_data = Some(context_data);
        self
    }

    /// Returns the redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        self.header(http::header::LOCATION.as_str())
    }

    fn full_content_type(&self) -> String {
        if self.content_type.starts_with("text/") || self.content_type.contains("json") {
            format!("{}; charset={}", self.content_type, self.charset)
        } else {
            self.content_type.clone()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = HeaderValue::from_str(&self.full_content_type()).ok();
        let mut response = axum::response::Response::new(axum::body::Body::from(self.content));
        *response.status_mut() = self.status;
        if let Some(ct) = content_type {
            response
                .headers_mut()
                .insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().insert(key, value.clone());
        }
        response
    }
}

/// A 302 Found redirect.
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(url: &str) -> HttpResponse {
        redirect(StatusCode::FOUND, url)
    }
}

/// A 301 Moved Permanently redirect.
pub struct HttpResponsePermanentRedirect;

impl HttpResponsePermanentRedirect {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(url: &str) -> HttpResponse {
        redirect(StatusCode::MOVED_PERMANENTLY, url)
    }
}

fn redirect(status: StatusCode, url: &str) -> HttpResponse {
    let mut response = HttpResponse::new(status, "");
    if let Ok(value) = HeaderValue::from_str(url) {
        response.headers.insert(http::header::LOCATION, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_constructors() {
        assert_eq!(HttpResponse::ok("").status(), StatusCode::OK);
        assert_eq!(HttpResponse::not_found("").status(), StatusCode::NOT_FOUND);
        assert_eq!(HttpResponse::forbidden("").status(), StatusCode::FORBIDDEN);
        assert_eq!(HttpResponse::bad_request("").status(), StatusCode::BAD_REQUEST);
        assert_eq!(HttpResponse::gone().status(), StatusCode::GONE);
        assert_eq!(
            HttpResponse::server_error("").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_allowed_sets_allow() {
        let response = HttpResponse::not_allowed(&["GET", "HEAD", "OPTIONS"]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, HEAD, OPTIONS"));
    }

    #[test]
    fn test_from_error_debug_includes_message() {
        let err = DjangoError::NotFound("Invalid page (3): That page contains no results".into());
        let response = HttpResponse::from_error(&err, true);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.text().contains("That page contains no results"));
    }

    #[test]
    fn test_from_error_production_hides_message() {
        let err = DjangoError::ImproperlyConfigured("secret detail".into());
        let response = HttpResponse::from_error(&err, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), "Internal Server Error");
        assert_eq!(response.content_type(), "text/plain");
    }

    #[test]
    fn test_from_error_permission_denied() {
        let err = DjangoError::PermissionDenied(String::new());
        assert_eq!(
            HttpResponse::from_error(&err, false).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_redirects() {
        let temp = HttpResponseRedirect::new("/authors/");
        assert_eq!(temp.status(), StatusCode::FOUND);
        assert_eq!(temp.location(), Some("/authors/"));

        let perm = HttpResponsePermanentRedirect::new("/new/");
        assert_eq!(perm.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(perm.location(), Some("/new/"));
    }

    #[test]
    fn test_with_template_records_context() {
        let mut ctx = serde_json::Map::new();
        ctx.insert("object".into(), serde_json::json!({"name": "Ada"}));
        let response =
            HttpResponse::ok("<p>Ada</p>").with_template(vec!["a/author_detail.html".into()], ctx);
        assert_eq!(response.template_name(), ["a/author_detail.html".to_string()]);
        assert_eq!(
            response.context_data().unwrap()["object"]["name"],
            serde_json::json!("Ada")
        );
    }

    #[test]
    fn test_clear_content() {
        let mut response = HttpResponse::ok("body");
        response.clear_content();
        assert!(response.content().is_empty());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_full_content_type() {
        let mut response = HttpResponse::ok("");
        assert_eq!(response.full_content_type(), "text/html; charset=utf-8");
        response.set_content_type("application/octet-stream");
        assert_eq!(response.full_content_type(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = HttpResponseRedirect::new("/x/").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get("location").unwrap(), "/x/");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );

        let body = HttpResponse::ok("hello")
            .into_response()
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"hello");
    }
}

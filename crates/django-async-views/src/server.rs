//! Serving views with axum.
//!
//! [`ViewApp`] maps path patterns to [`ViewFunction`]s. Patterns use
//! axum's syntax: `{name}` captures one segment and `{*name}` the rest of
//! the path. Captures become the request's URL kwargs.
//!
//! ```no_run
//! use django_async_views::{RedirectView, TemplateView, View, ViewApp};
//!
//! # async fn example() -> Result<(), django_async_core::DjangoError> {
//! let app = ViewApp::new()
//!     .route("/", TemplateView::new("home.html").as_view())
//!     .route("/old/{slug}/", RedirectView::new("/new/{slug}/").as_view());
//! app.run("127.0.0.1:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use django_async_core::logging::request_span;
use django_async_core::{DjangoError, DjangoResult};
use django_async_http::{HttpRequest, HttpResponse};
use percent_encoding::percent_decode_str;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::base::ViewFunction;

/// Largest request body read into memory (2.5 MiB).
pub const MAX_BODY_SIZE: usize = 2_621_440;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// A router of class-based views.
#[derive(Default)]
pub struct ViewApp {
    routes: Vec<(String, ViewFunction)>,
}

impl ViewApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `view` at `pattern`.
    #[must_use]
    pub fn route(mut self, pattern: &str, view: ViewFunction) -> Self {
        self.routes.push((pattern.to_string(), view));
        self
    }

    /// The registered patterns, in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn into_router(self) -> axum::Router {
        let mut router = axum::Router::new();
        for (pattern, view) in self.routes {
            let route_pattern: Arc<str> = Arc::from(pattern.as_str());
            router = router.route(
                &pattern,
                any(move |request: Request<Body>| {
                    serve_view(view.clone(), route_pattern.clone(), request)
                }),
            );
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// Binds `addr` and serves until the process stops.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound or the server errors.
    pub async fn run(self, addr: &str) -> DjangoResult<()> {
        let router = self.into_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            DjangoError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;
        tracing::info!("Serving views at http://{addr}/");
        axum::serve(listener, router)
            .await
            .map_err(|e| DjangoError::InternalServerError(format!("Server error: {e}")))
    }
}

impl std::fmt::Debug for ViewApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewApp")
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .finish()
    }
}

async fn serve_view(view: ViewFunction, pattern: Arc<str>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
    let span = request_span(&request_id, parts.method.as_str(), parts.uri.path());

    async move {
        let body = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read request body");
                return HttpResponse::bad_request("Bad Request").into_response();
            }
        };
        let kwargs = match_kwargs(&pattern, parts.uri.path()).unwrap_or_default();
        let mut request = HttpRequest::from_axum(parts, body);
        request.set_kwargs(kwargs);

        let response = view(request).await;
        tracing::debug!(status = response.status().as_u16(), "Response ready");
        response.into_response()
    }
    .instrument(span)
    .await
}

/// Extracts the captures of `pattern` from `path`, percent-decoded.
///
/// Returns `None` when the path does not fit the pattern.
pub fn match_kwargs(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let mut kwargs = HashMap::new();
    let mut path_segments = path.split('/');
    for part in pattern.split('/') {
        if let Some(name) = part.strip_prefix("{*").and_then(|p| p.strip_suffix('}')) {
            let rest: Vec<&str> = path_segments.by_ref().collect();
            kwargs.insert(name.to_string(), decode(&rest.join("/")));
            return Some(kwargs);
        }
        let segment = path_segments.next()?;
        if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            kwargs.insert(name.to_string(), decode(segment));
        } else if part != segment {
            return None;
        }
    }
    path_segments.next().is_none().then_some(kwargs)
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

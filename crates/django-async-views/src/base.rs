//! The [`View`] trait, context and template mixins, and the two simple
//! concrete views: [`TemplateView`] and [`RedirectView`].
//!
//! Views are shared behind an `Arc` once turned into a [`ViewFunction`], so
//! every per-request value (the fetched object, the form, the page) travels
//! through method arguments and return values. Handlers return
//! `DjangoResult<HttpResponse>`; [`View::as_view`] turns errors into
//! responses.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult, SETTINGS};
use django_async_db::interpolate;
use django_async_http::{HttpRequest, HttpResponse, HttpResponsePermanentRedirect, HttpResponseRedirect};
use django_async_template::{Context, Engine};
use http::header::{HeaderValue, ALLOW, CONTENT_LENGTH};
use http::{Method, StatusCode};

/// The future returned by a [`ViewFunction`].
pub type ViewFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A view as a request handler.
pub type ViewFunction = Arc<dyn Fn(HttpRequest) -> ViewFuture + Send + Sync>;

/// Every method a view may answer, in `Allow` header order.
pub const HTTP_METHOD_NAMES: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// The last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// The request's URL kwargs as a template context.
pub fn kwargs_context(request: &HttpRequest) -> Context {
    request
        .kwargs()
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect()
}

/// A class-based view: method dispatch plus an access hook.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use django_async_core::DjangoResult;
/// use django_async_http::{HttpRequest, HttpResponse};
/// use django_async_views::View;
/// use http::Method;
///
/// struct Ping;
///
/// #[async_trait]
/// impl View for Ping {
///     fn allowed_methods(&self) -> Vec<Method> {
///         vec![Method::GET]
///     }
///
///     async fn get(&self, _request: HttpRequest) -> DjangoResult<HttpResponse> {
///         Ok(HttpResponse::ok("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait View: Send + Sync + 'static {
    /// The name used in log lines and error messages. Defaults to the type
    /// name.
    fn view_name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// The methods this view could ever answer.
    fn http_method_names(&self) -> &[Method] {
        &HTTP_METHOD_NAMES
    }

    /// The methods this view implements handlers for.
    fn allowed_methods(&self) -> Vec<Method>;

    /// [`allowed_methods`](Self::allowed_methods) plus HEAD when GET is
    /// allowed, plus OPTIONS, in canonical order.
    fn effective_methods(&self) -> Vec<Method> {
        let declared = self.allowed_methods();
        let has_get = declared.contains(&Method::GET);
        self.http_method_names()
            .iter()
            .filter(|m| {
                declared.contains(m) || **m == Method::OPTIONS || (**m == Method::HEAD && has_get)
            })
            .cloned()
            .collect()
    }

    /// Runs before method dispatch. Returning a response short-circuits
    /// the request; returning an error fails it.
    async fn check_access(&self, _request: &HttpRequest) -> DjangoResult<Option<HttpResponse>> {
        Ok(None)
    }

    async fn dispatch(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        if let Some(response) = self.check_access(&request).await? {
            return Ok(response);
        }
        let method = request.method().clone();
        if !self.effective_methods().contains(&method) {
            return Ok(self.http_method_not_allowed(&request));
        }
        match method {
            Method::GET => self.get(request).await,
            Method::POST => self.post(request).await,
            Method::PUT => self.put(request).await,
            Method::PATCH => self.patch(request).await,
            Method::DELETE => self.delete(request).await,
            Method::HEAD => self.head(request).await,
            Method::OPTIONS => self.options(request).await,
            _ => Ok(self.http_method_not_allowed(&request)),
        }
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    async fn put(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    async fn patch(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    async fn delete(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Answers with the GET handler when GET is allowed.
    async fn head(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        if self.allowed_methods().contains(&Method::GET) {
            self.get(request).await
        } else {
            Ok(self.http_method_not_allowed(&request))
        }
    }

    /// An empty 200 listing the effective methods in `Allow`.
    async fn options(&self, _request: HttpRequest) -> DjangoResult<HttpResponse> {
        let mut response = HttpResponse::ok("");
        let allow = method_list(&self.effective_methods());
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(ALLOW, value);
        }
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        Ok(response)
    }

    fn http_method_not_allowed(&self, request: &HttpRequest) -> HttpResponse {
        tracing::warn!(
            view = self.view_name(),
            "Method Not Allowed ({}): {}",
            request.method(),
            request.path()
        );
        let methods = self.effective_methods();
        let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
        HttpResponse::not_allowed(&names)
    }

    /// Wraps the view into a request handler. Errors become responses via
    /// [`HttpResponse::from_error`].
    #[allow(clippy::wrong_self_convention)]
    fn as_view(self) -> ViewFunction
    where
        Self: Sized,
    {
        let view = Arc::new(self);
        Arc::new(move |request: HttpRequest| -> ViewFuture {
            let view = view.clone();
            Box::pin(async move {
                match view.dispatch(request).await {
                    Ok(response) => response,
                    Err(err) => HttpResponse::from_error(&err, SETTINGS.get_or_default().debug),
                }
            })
        })
    }
}

fn method_list(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Supplies template context.
#[async_trait]
pub trait ContextMixin: View {
    /// Values merged into every context.
    fn extra_context(&self) -> Option<&Context> {
        None
    }

    /// Returns `kwargs` with `view` set (unless present) and
    /// [`extra_context`](Self::extra_context) merged over it.
    async fn get_context_data(&self, _request: &HttpRequest, kwargs: Context) -> DjangoResult<Context> {
        let mut context = kwargs;
        context
            .entry("view")
            .or_insert_with(|| serde_json::Value::String(self.view_name().to_string()));
        if let Some(extra) = self.extra_context() {
            for (key, value) in extra {
                context.insert(key.clone(), value.clone());
            }
        }
        Ok(context)
    }
}

/// Renders a template into a response.
pub trait TemplateResponseMixin: View {
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// Without an engine, responses fall back to a JSON dump of the context.
    fn template_engine(&self) -> Option<&Engine> {
        None
    }

    /// Overrides the response content type (`text/html` by default).
    fn content_type(&self) -> Option<&str> {
        None
    }

    fn response_status(&self) -> StatusCode {
        StatusCode::OK
    }

    fn get_template_names(&self) -> DjangoResult<Vec<String>> {
        self.template_name()
            .map(|name| vec![name.to_string()])
            .ok_or_else(|| {
                DjangoError::ImproperlyConfigured(
                    "TemplateResponseMixin requires either a definition of 'template_name' or an \
                     implementation of 'get_template_names()'"
                        .to_string(),
                )
            })
    }

    /// Renders the first existing template of `template_names`.
    ///
    /// The response records the candidate names and the context.
    fn render_to_response(
        &self,
        template_names: Vec<String>,
        context: Context,
    ) -> DjangoResult<HttpResponse> {
        let body = match self.template_engine() {
            Some(engine) => {
                let name = engine.select_template(&template_names)?;
                engine.render_to_string(&name, &context)?
            }
            None => {
                let first = template_names.first().map_or("", String::as_str);
                let dump = serde_json::to_string_pretty(&context)?;
                format!("<!-- Template: {first} -->\n<html><body><pre>{dump}</pre></body></html>")
            }
        };
        let mut response = HttpResponse::new(self.response_status(), body);
        if let Some(content_type) = self.content_type() {
            response.set_content_type(content_type);
        }
        Ok(response.with_template(template_names, context))
    }
}

/// Renders a template with the URL kwargs as context.
///
/// # Examples
///
/// ```
/// use django_async_views::TemplateView;
///
/// let view = TemplateView::new("about.html").with_context("title", "About".into());
/// ```
pub struct TemplateView {
    template: Option<String>,
    extra_context: Option<Context>,
    engine: Option<Arc<Engine>>,
    content_type: Option<String>,
}

impl TemplateView {
    pub fn new(template: &str) -> Self {
        Self {
            template: Some(template.to_string()),
            extra_context: None,
            engine: None,
            content_type: None,
        }
    }

    /// A view with no template; rendering fails with `ImproperlyConfigured`.
    pub const fn without_template() -> Self {
        Self {
            template: None,
            extra_context: None,
            engine: None,
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra_context
            .get_or_insert_with(Context::new)
            .insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

#[async_trait]
impl View for TemplateView {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let context = self
            .get_context_data(&request, kwargs_context(&request))
            .await?;
        self.render_to_response(self.get_template_names()?, context)
    }
}

impl ContextMixin for TemplateView {
    fn extra_context(&self) -> Option<&Context> {
        self.extra_context.as_ref()
    }
}

impl TemplateResponseMixin for TemplateView {
    fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn template_engine(&self) -> Option<&Engine> {
        self.engine.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Redirects every request to a URL.
///
/// `{name}` placeholders in the URL are filled from the URL kwargs. With no
/// URL the view answers 410 Gone.
#[derive(Debug, Clone, Default)]
pub struct RedirectView {
    url: Option<String>,
    permanent: bool,
    query_string: bool,
}

impl RedirectView {
    /// A temporary (302) redirect to `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// A view with no target, answering 410 Gone.
    pub fn gone() -> Self {
        Self::default()
    }

    /// Use 301 instead of 302.
    #[must_use]
    pub const fn permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    /// Append the request's query string to the target.
    #[must_use]
    pub const fn query_string(mut self, query_string: bool) -> Self {
        self.query_string = query_string;
        self
    }

    /// The target for `request`, or `None` when the view has no URL.
    pub fn get_redirect_url(&self, request: &HttpRequest) -> Option<String> {
        let url = interpolate(self.url.as_deref()?, request.kwargs());
        let args = request.query_string();
        if self.query_string && !args.is_empty() {
            Some(format!("{url}?{args}"))
        } else {
            Some(url)
        }
    }
}

#[async_trait]
impl View for RedirectView {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
        ]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        match self.get_redirect_url(&request) {
            Some(url) if self.permanent => Ok(HttpResponsePermanentRedirect::new(&url)),
            Some(url) => Ok(HttpResponseRedirect::new(&url)),
            None => {
                tracing::warn!("Gone: {}", request.path());
                Ok(HttpResponse::gone())
            }
        }
    }

    async fn head(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.get(request).await
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.get(request).await
    }

    async fn put(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.get(request).await
    }

    async fn patch(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.get(request).await
    }

    async fn delete(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.get(request).await
    }
}

//! Access mixins for class-based views.
//!
//! A view opts in by implementing [`AccessMixin`] and one or more of the
//! check traits, then calling the checks from [`View::check_access`]. Each
//! check returns `Ok(Some(response))` to short-circuit with a login
//! redirect, `Err(PermissionDenied)` to refuse, or `Ok(None)` to continue.
//!
//! Views that are not your own types (e.g. a `ListView`) can be wrapped in
//! [`LoginRequired`], [`PermissionRequired`] or [`UserPassesTest`].

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult, SETTINGS};
use django_async_http::{HttpRequest, HttpResponse, HttpResponseRedirect, QueryDict};
use django_async_views::View;
use http::Method;
use url::Url;

use crate::request::AuthRequestExt;

/// Configuration shared by the access checks.
#[async_trait]
pub trait AccessMixin: View {
    /// Overrides `settings.login_url`.
    fn login_url(&self) -> Option<&str> {
        None
    }

    fn permission_denied_message(&self) -> &str {
        ""
    }

    /// Refuse with 403 instead of redirecting anonymous users.
    fn raise_exception(&self) -> bool {
        false
    }

    /// The query parameter carrying the original URL. `None` omits it.
    fn redirect_field_name(&self) -> Option<&str> {
        Some("next")
    }

    fn get_login_url(&self) -> DjangoResult<String> {
        let login_url = self
            .login_url()
            .map_or_else(|| SETTINGS.get_or_default().login_url.clone(), String::from);
        if login_url.is_empty() {
            let name = self.view_name();
            return Err(DjangoError::ImproperlyConfigured(format!(
                "{name} is missing the login_url attribute. Define {name}.login_url, \
                 settings.LOGIN_URL, or override {name}.get_login_url()."
            )));
        }
        Ok(login_url)
    }

    /// Refuses authenticated users and redirects anonymous ones to login.
    async fn handle_no_permission(&self, request: &HttpRequest) -> DjangoResult<HttpResponse> {
        if self.raise_exception() || request.auser().await?.is_authenticated() {
            return Err(DjangoError::PermissionDenied(
                self.permission_denied_message().to_string(),
            ));
        }

        let login_url = self.get_login_url()?;
        let absolute = request.build_absolute_uri(None);
        let (login_scheme, login_netloc) = scheme_and_netloc(&login_url);
        let (current_scheme, current_netloc) = scheme_and_netloc(&absolute);
        let same_scheme = login_scheme.is_none() || login_scheme == current_scheme;
        let same_netloc = login_netloc.is_none() || login_netloc == current_netloc;
        let next = if same_scheme && same_netloc {
            request.get_full_path()
        } else {
            absolute
        };
        tracing::debug!(
            view = self.view_name(),
            login_url = %login_url,
            "Redirecting to login"
        );
        redirect_to_login(&next, &login_url, self.redirect_field_name())
    }
}

/// Redirects to `login_url` with `next` in `redirect_field_name`.
///
/// A query already on the login URL is preserved.
///
/// ```
/// use django_async_auth::redirect_to_login;
///
/// # fn main() -> django_async_core::DjangoResult<()> {
/// let response = redirect_to_login("/books/?page=2", "/login/?lang=en", Some("next"))?;
/// assert_eq!(response.location(), Some("/login/?lang=en&next=/books/%3Fpage%3D2"));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Propagates a failure to set `redirect_field_name` on the query.
pub fn redirect_to_login(
    next: &str,
    login_url: &str,
    redirect_field_name: Option<&str>,
) -> DjangoResult<HttpResponse> {
    let Some(field) = redirect_field_name else {
        return Ok(HttpResponseRedirect::new(login_url));
    };
    let (rest, fragment) = match login_url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (login_url, None),
    };
    let (base, query) = rest.split_once('?').unwrap_or((rest, ""));
    let mut querystring = QueryDict::parse(query).copy();
    querystring.set(field, next)?;
    let mut url = format!("{base}?{}", querystring.urlencode_safe("/"));
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    Ok(HttpResponseRedirect::new(&url))
}

/// Scheme and `host[:port]` of an absolute URL; `(None, None)` for a
/// relative one.
fn scheme_and_netloc(raw: &str) -> (Option<String>, Option<String>) {
    let Ok(url) = Url::parse(raw) else {
        return (None, None);
    };
    let netloc = url.host_str().map(|host| match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    });
    (Some(url.scheme().to_string()), netloc)
}

/// Requires an authenticated user.
#[async_trait]
pub trait LoginRequiredMixin: AccessMixin {
    async fn check_login(&self, request: &HttpRequest) -> DjangoResult<Option<HttpResponse>> {
        if request.auser().await?.is_authenticated() {
            Ok(None)
        } else {
            self.handle_no_permission(request).await.map(Some)
        }
    }
}

/// Requires the user to hold every listed permission.
#[async_trait]
pub trait PermissionRequiredMixin: AccessMixin {
    /// One or more `"app_label.codename"` permissions.
    fn permission_required(&self) -> &[String] {
        &[]
    }

    fn get_permission_required(&self) -> DjangoResult<Vec<String>> {
        let perms = self.permission_required();
        if perms.is_empty() {
            let name = self.view_name();
            return Err(DjangoError::ImproperlyConfigured(format!(
                "{name} is missing the permission_required attribute. Define \
                 {name}.permission_required, or override {name}.get_permission_required()."
            )));
        }
        Ok(perms.to_vec())
    }

    async fn has_permission(&self, request: &HttpRequest) -> DjangoResult<bool> {
        let perms = self.get_permission_required()?;
        Ok(request.auser().await?.has_perms(perms.as_slice()))
    }

    async fn check_permissions(&self, request: &HttpRequest) -> DjangoResult<Option<HttpResponse>> {
        if self.has_permission(request).await? {
            Ok(None)
        } else {
            self.handle_no_permission(request).await.map(Some)
        }
    }
}

/// Requires [`test_func`](Self::test_func) to pass.
#[async_trait]
pub trait UserPassesTestMixin: AccessMixin {
    async fn test_func(&self, request: &HttpRequest) -> DjangoResult<bool>;

    async fn check_test(&self, request: &HttpRequest) -> DjangoResult<Option<HttpResponse>> {
        if self.test_func(request).await? {
            Ok(None)
        } else {
            self.handle_no_permission(request).await.map(Some)
        }
    }
}

/// Access settings for the wrapper views.
#[derive(Debug, Clone)]
struct AccessOptions {
    login_url: Option<String>,
    permission_denied_message: String,
    raise_exception: bool,
    redirect_field_name: Option<String>,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            login_url: None,
            permission_denied_message: String::new(),
            raise_exception: false,
            redirect_field_name: Some("next".to_string()),
        }
    }
}

macro_rules! impl_access_wrapper {
    ($wrapper:ident < $($param:ident),+ >, $check:ident where $($bounds:tt)+) => {
        impl<$($param),+> $wrapper<$($param),+> where $($bounds)+ {
            #[must_use]
            pub fn login_url(mut self, url: &str) -> Self {
                self.access.login_url = Some(url.to_string());
                self
            }

            #[must_use]
            pub fn permission_denied_message(mut self, message: &str) -> Self {
                self.access.permission_denied_message = message.to_string();
                self
            }

            #[must_use]
            pub const fn raise_exception(mut self, raise: bool) -> Self {
                self.access.raise_exception = raise;
                self
            }

            #[must_use]
            pub fn redirect_field_name(mut self, name: Option<&str>) -> Self {
                self.access.redirect_field_name = name.map(String::from);
                self
            }

            pub const fn inner(&self) -> &V {
                &self.inner
            }
        }

        #[async_trait]
        impl<$($param),+> View for $wrapper<$($param),+> where $($bounds)+ {
            fn view_name(&self) -> &str {
                self.inner.view_name()
            }

            fn http_method_names(&self) -> &[Method] {
                self.inner.http_method_names()
            }

            fn allowed_methods(&self) -> Vec<Method> {
                self.inner.allowed_methods()
            }

            async fn check_access(
                &self,
                request: &HttpRequest,
            ) -> DjangoResult<Option<HttpResponse>> {
                self.$check(request).await
            }

            async fn dispatch(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
                if let Some(response) = self.check_access(&request).await? {
                    return Ok(response);
                }
                self.inner.dispatch(request).await
            }
        }

        impl<$($param),+> AccessMixin for $wrapper<$($param),+> where $($bounds)+ {
            fn login_url(&self) -> Option<&str> {
                self.access.login_url.as_deref()
            }

            fn permission_denied_message(&self) -> &str {
                &self.access.permission_denied_message
            }

            fn raise_exception(&self) -> bool {
                self.access.raise_exception
            }

            fn redirect_field_name(&self) -> Option<&str> {
                self.access.redirect_field_name.as_deref()
            }
        }
    };
}

/// Wraps a view so only authenticated users reach it.
pub struct LoginRequired<V> {
    inner: V,
    access: AccessOptions,
}

impl<V: View> LoginRequired<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            access: AccessOptions::default(),
        }
    }
}

impl<V: View> LoginRequiredMixin for LoginRequired<V> {}

impl_access_wrapper!(LoginRequired<V>, check_login where V: View);

/// Wraps a view so only users holding the given permissions reach it.
pub struct PermissionRequired<V> {
    inner: V,
    access: AccessOptions,
    perms: Vec<String>,
}

impl<V: View> PermissionRequired<V> {
    pub fn new<S: AsRef<str>>(inner: V, perms: &[S]) -> Self {
        Self {
            inner,
            access: AccessOptions::default(),
            perms: perms.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }
}

impl<V: View> PermissionRequiredMixin for PermissionRequired<V> {
    fn permission_required(&self) -> &[String] {
        &self.perms
    }
}

impl_access_wrapper!(PermissionRequired<V>, check_permissions where V: View);

/// The predicate of a [`UserPassesTest`] view.
pub type TestFuture<'a> = Pin<Box<dyn Future<Output = DjangoResult<bool>> + Send + 'a>>;

/// Wraps a view behind an arbitrary async predicate on the request.
pub struct UserPassesTest<V, F> {
    inner: V,
    access: AccessOptions,
    test: F,
}

impl<V, F> UserPassesTest<V, F>
where
    V: View,
    F: for<'a> Fn(&'a HttpRequest) -> TestFuture<'a> + Send + Sync + 'static,
{
    pub fn new(inner: V, test: F) -> Self {
        Self {
            inner,
            access: AccessOptions::default(),
            test,
        }
    }
}

#[async_trait]
impl<V, F> UserPassesTestMixin for UserPassesTest<V, F>
where
    V: View,
    F: for<'a> Fn(&'a HttpRequest) -> TestFuture<'a> + Send + Sync + 'static,
{
    async fn test_func(&self, request: &HttpRequest) -> DjangoResult<bool> {
        (self.test)(request).await
    }
}

impl_access_wrapper!(
    UserPassesTest<V, F>, check_test
    where
        V: View,
        F: for<'a> Fn(&'a HttpRequest) -> TestFuture<'a> + Send + Sync + 'static,
);

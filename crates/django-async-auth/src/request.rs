//! Attaching users to requests.
//!
//! A request carries its user lazily: a [`UserSource`] is installed with
//! [`attach_user_source`] and consulted the first time a view awaits
//! [`AuthRequestExt::auser`]. The result is cached for the rest of the
//! request, including on clones. A request with nothing attached is
//! anonymous.

use std::sync::Arc;

use async_trait::async_trait;
use django_async_core::DjangoResult;
use django_async_http::HttpRequest;
use django_async_views::{ViewFunction, ViewFuture};
use tokio::sync::OnceCell;

use crate::user::RequestUser;

/// Loads the user of one request, e.g. from a session store.
#[async_trait]
pub trait UserSource: Send + Sync + 'static {
    async fn load_user(&self) -> DjangoResult<RequestUser>;
}

/// A source that always yields the same user.
#[async_trait]
impl UserSource for RequestUser {
    async fn load_user(&self) -> DjangoResult<RequestUser> {
        Ok(self.clone())
    }
}

#[derive(Clone)]
struct LazyUser {
    source: Option<Arc<dyn UserSource>>,
    user: Arc<OnceCell<RequestUser>>,
}

/// Installs an already-loaded user.
pub fn attach_user(request: &mut HttpRequest, user: RequestUser) {
    request.extensions_mut().insert(LazyUser {
        source: None,
        user: Arc::new(OnceCell::new_with(Some(user))),
    });
}

/// Installs a source to load the user from on first use.
pub fn attach_user_source(request: &mut HttpRequest, source: Arc<dyn UserSource>) {
    request.extensions_mut().insert(LazyUser {
        source: Some(source),
        user: Arc::new(OnceCell::new()),
    });
}

/// Access to the user of a request.
#[async_trait]
pub trait AuthRequestExt {
    /// The request's user, loaded at most once.
    async fn auser(&self) -> DjangoResult<RequestUser>;
}

#[async_trait]
impl AuthRequestExt for HttpRequest {
    async fn auser(&self) -> DjangoResult<RequestUser> {
        let Some(lazy) = self.extensions().get::<LazyUser>() else {
            return Ok(RequestUser::Anonymous);
        };
        let user = lazy
            .user
            .get_or_try_init(|| async {
                let user = match &lazy.source {
                    Some(source) => source.load_user().await,
                    None => Ok(RequestUser::Anonymous),
                };
                if let Ok(user) = &user {
                    tracing::debug!(user = user.get_username(), "Loaded request user");
                }
                user
            })
            .await?;
        Ok(user.clone())
    }
}

/// Wraps `view` so every request gets the user source chosen by `resolve`.
///
/// `resolve` sees the request before the view does and may return `None`
/// to leave it anonymous.
pub fn with_user_source<F>(view: ViewFunction, resolve: F) -> ViewFunction
where
    F: Fn(&HttpRequest) -> Option<Arc<dyn UserSource>> + Send + Sync + 'static,
{
    Arc::new(move |mut request: HttpRequest| -> ViewFuture {
        if let Some(source) = resolve(&request) {
            attach_user_source(&mut request, source);
        }
        view(request)
    })
}

//! # django-async-auth
//!
//! Users, permissions and access control for django-async views.
//!
//! - [`user`] - [`AbstractUser`] and the per-request [`RequestUser`]
//! - [`permissions`] - [`Permission`], [`Group`] and permission checks
//! - [`request`] - attaching users to requests and reading them back
//! - [`mixins`] - login, permission and predicate checks for views
//!
//! ## Protecting a view
//!
//! ```
//! use django_async_auth::{LoginRequired, PermissionRequired};
//! use django_async_views::{TemplateView, View};
//!
//! let dashboard = LoginRequired::new(TemplateView::new("dashboard.html")).as_view();
//! let admin = PermissionRequired::new(TemplateView::new("admin.html"), &["library.change_book"])
//!     .raise_exception(true)
//!     .as_view();
//! # let _ = (dashboard, admin);
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]

pub mod mixins;
pub mod permissions;
pub mod request;
pub mod user;

pub use mixins::{
    redirect_to_login, AccessMixin, LoginRequired, LoginRequiredMixin, PermissionRequired,
    PermissionRequiredMixin, TestFuture, UserPassesTest, UserPassesTestMixin,
};
pub use permissions::{
    default_permissions, get_all_permissions, get_group_permissions, has_module_perms, has_perm,
    has_perms, Group, Permission,
};
pub use request::{attach_user, attach_user_source, with_user_source, AuthRequestExt, UserSource};
pub use user::{AbstractUser, RequestUser};

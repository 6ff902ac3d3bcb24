//! Single-object views: the [`SingleObjectMixin`] lookup and [`DetailView`].
//!
//! [`ObjectOptions`] holds the configuration every single-object view
//! shares. The detail, create, update, delete and date-detail views embed
//! it and get their mixin impls from `impl_object_view!`.

use std::sync::Arc;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{FieldType, Lookup, Model, QuerySet, Value};
use django_async_http::{HttpRequest, HttpResponse};
use django_async_template::{Context, Engine};
use http::Method;

use crate::base::{ContextMixin, TemplateResponseMixin, View};

/// Behaviour shared by views that operate on one object.
#[async_trait]
pub trait SingleObjectMixin: ContextMixin + TemplateResponseMixin {
    type Object: Model;

    fn queryset(&self) -> Option<&QuerySet<Self::Object>> {
        None
    }

    fn pk_url_kwarg(&self) -> &str {
        "pk"
    }

    fn slug_url_kwarg(&self) -> &str {
        "slug"
    }

    /// The model field matched against the slug kwarg.
    fn slug_field(&self) -> &str {
        "slug"
    }

    /// Filter on both pk and slug when both kwargs are present. By default
    /// the slug is ignored once a pk is given.
    fn query_pk_and_slug(&self) -> bool {
        false
    }

    fn context_object_name(&self) -> Option<&str> {
        None
    }

    /// A model field whose value names the template to use.
    fn template_name_field(&self) -> Option<&str> {
        None
    }

    fn template_name_suffix(&self) -> &str {
        "_detail"
    }

    async fn get_queryset(&self, _request: &HttpRequest) -> DjangoResult<QuerySet<Self::Object>> {
        self.queryset().cloned().ok_or_else(|| {
            let name = self.view_name();
            DjangoError::ImproperlyConfigured(format!(
                "{name} is missing a QuerySet. Define {name}.model, {name}.queryset, or override \
                 {name}.get_queryset()."
            ))
        })
    }

    /// Fetches the object named by the URL's pk and/or slug kwargs.
    async fn get_object(&self, request: &HttpRequest) -> DjangoResult<Self::Object> {
        let meta = Self::Object::meta();
        let mut queryset = self.get_queryset(request).await?;
        let pk = request.kwarg(self.pk_url_kwarg());
        let slug = request.kwarg(self.slug_url_kwarg());

        if let Some(pk) = pk {
            let field = Self::Object::pk_field_name();
            queryset = queryset.filter(Lookup::exact(field, url_value::<Self::Object>(field, pk)?));
        }
        if let Some(slug) = slug {
            if pk.is_none() || self.query_pk_and_slug() {
                let field = self.slug_field();
                queryset =
                    queryset.filter(Lookup::exact(field, url_value::<Self::Object>(field, slug)?));
            }
        }
        if pk.is_none() && slug.is_none() {
            return Err(DjangoError::ImproperlyConfigured(format!(
                "Generic detail view {} must be called with either an object pk or a slug in the \
                 URLconf.",
                self.view_name()
            )));
        }

        queryset.get().await.map_err(|err| match err {
            DjangoError::DoesNotExist(_) => DjangoError::NotFound(format!(
                "No {} found matching the query",
                meta.verbose_name
            )),
            other => other,
        })
    }

    fn get_context_object_name(&self, _object: &Self::Object) -> Option<String> {
        Some(
            self.context_object_name()
                .map_or_else(|| Self::Object::meta().model_name.to_string(), String::from),
        )
    }

    /// Adds `object` and the context object name when there is an object,
    /// then `extra` and the [`ContextMixin`] values.
    async fn get_object_context_data(
        &self,
        request: &HttpRequest,
        object: Option<&Self::Object>,
        extra: Context,
    ) -> DjangoResult<Context> {
        let mut context = Context::new();
        if let Some(object) = object {
            let value = object.to_context();
            if let Some(name) = self.get_context_object_name(object) {
                context.insert(name, value.clone());
            }
            context.insert("object".into(), value);
        }
        context.extend(extra);
        self.get_context_data(request, context).await
    }

    /// The configured template name alone, or else the
    /// [`template_name_field`](Self::template_name_field) value followed by
    /// `<app>/<model><suffix>.html`.
    fn get_object_template_names(&self, object: Option<&Self::Object>) -> DjangoResult<Vec<String>> {
        if let Ok(names) = self.get_template_names() {
            return Ok(names);
        }
        let mut names = Vec::new();
        if let (Some(object), Some(field)) = (object, self.template_name_field()) {
            if let Some(name) = object.field_value(field).and_then(|v| v.as_str().map(String::from)) {
                if !name.is_empty() {
                    names.push(name);
                }
            }
        }
        let meta = Self::Object::meta();
        names.push(format!(
            "{}/{}{}.html",
            meta.app_label,
            meta.model_name,
            self.template_name_suffix()
        ));
        Ok(names)
    }
}

/// Converts a URL kwarg to the type of model field `field`.
pub(crate) fn url_value<M: Model>(field: &str, raw: &str) -> DjangoResult<Value> {
    let meta = M::meta();
    match meta.get_field(field).map(|f| f.field_type) {
        Some(FieldType::AutoField | FieldType::IntegerField) => {
            raw.parse::<i64>().map(Value::Int).map_err(|_| {
                DjangoError::NotFound(format!("No {} found matching the query", meta.verbose_name))
            })
        }
        _ => Ok(Value::from(raw)),
    }
}

/// Configuration shared by every single-object view.
pub struct ObjectOptions<M: Model> {
    pub(crate) name: String,
    pub(crate) queryset: Option<QuerySet<M>>,
    pub(crate) template_name: Option<String>,
    pub(crate) template_name_suffix: String,
    pub(crate) template_name_field: Option<String>,
    pub(crate) engine: Option<Arc<Engine>>,
    pub(crate) extra_context: Option<Context>,
    pub(crate) content_type: Option<String>,
    pub(crate) context_object_name: Option<String>,
    pub(crate) pk_url_kwarg: String,
    pub(crate) slug_url_kwarg: String,
    pub(crate) slug_field: String,
    pub(crate) query_pk_and_slug: bool,
}

impl<M: Model> ObjectOptions<M> {
    pub(crate) fn new(name: &str, suffix: &str) -> Self {
        Self {
            name: name.to_string(),
            queryset: None,
            template_name: None,
            template_name_suffix: suffix.to_string(),
            template_name_field: None,
            engine: None,
            extra_context: None,
            content_type: None,
            context_object_name: None,
            pk_url_kwarg: "pk".to_string(),
            slug_url_kwarg: "slug".to_string(),
            slug_field: "slug".to_string(),
            query_pk_and_slug: false,
        }
    }
}

/// Implements the option builders plus `ContextMixin`,
/// `TemplateResponseMixin` and `SingleObjectMixin` for a view struct that
/// keeps its [`ObjectOptions`] in an `opts` field. An optional trailing
/// bound is added to `M`, matching the bound on the view's `View` impl.
macro_rules! impl_object_view {
    ($view:ident $(, $bound:path)?) => {
        impl<M: django_async_db::Model $(+ $bound)?> $view<M> {
            #[must_use]
            pub fn queryset(mut self, queryset: django_async_db::QuerySet<M>) -> Self {
                self.opts.queryset = Some(queryset);
                self
            }

            #[must_use]
            pub fn template_name(mut self, name: &str) -> Self {
                self.opts.template_name = Some(name.to_string());
                self
            }

            #[must_use]
            pub fn template_name_suffix(mut self, suffix: &str) -> Self {
                self.opts.template_name_suffix = suffix.to_string();
                self
            }

            #[must_use]
            pub fn template_name_field(mut self, field: &str) -> Self {
                self.opts.template_name_field = Some(field.to_string());
                self
            }

            #[must_use]
            pub fn engine(mut self, engine: std::sync::Arc<django_async_template::Engine>) -> Self {
                self.opts.engine = Some(engine);
                self
            }

            #[must_use]
            pub fn extra_context(mut self, context: django_async_template::Context) -> Self {
                self.opts.extra_context = Some(context);
                self
            }

            #[must_use]
            pub fn content_type(mut self, content_type: &str) -> Self {
                self.opts.content_type = Some(content_type.to_string());
                self
            }

            #[must_use]
            pub fn context_object_name(mut self, name: &str) -> Self {
                self.opts.context_object_name = Some(name.to_string());
                self
            }

            #[must_use]
            pub fn pk_url_kwarg(mut self, kwarg: &str) -> Self {
                self.opts.pk_url_kwarg = kwarg.to_string();
                self
            }

            #[must_use]
            pub fn slug_url_kwarg(mut self, kwarg: &str) -> Self {
                self.opts.slug_url_kwarg = kwarg.to_string();
                self
            }

            #[must_use]
            pub fn slug_field(mut self, field: &str) -> Self {
                self.opts.slug_field = field.to_string();
                self
            }

            #[must_use]
            pub const fn query_pk_and_slug(mut self, both: bool) -> Self {
                self.opts.query_pk_and_slug = both;
                self
            }
        }

        impl<M: django_async_db::Model $(+ $bound)?> $crate::base::ContextMixin for $view<M> {
            fn extra_context(&self) -> Option<&django_async_template::Context> {
                self.opts.extra_context.as_ref()
            }
        }

        impl<M: django_async_db::Model $(+ $bound)?> $crate::base::TemplateResponseMixin for $view<M> {
            fn template_name(&self) -> Option<&str> {
                self.opts.template_name.as_deref()
            }

            fn template_engine(&self) -> Option<&django_async_template::Engine> {
                self.opts.engine.as_deref()
            }

            fn content_type(&self) -> Option<&str> {
                self.opts.content_type.as_deref()
            }
        }

        impl<M: django_async_db::Model $(+ $bound)?> $crate::detail::SingleObjectMixin for $view<M> {
            type Object = M;

            fn queryset(&self) -> Option<&django_async_db::QuerySet<M>> {
                self.opts.queryset.as_ref()
            }

            fn pk_url_kwarg(&self) -> &str {
                &self.opts.pk_url_kwarg
            }

            fn slug_url_kwarg(&self) -> &str {
                &self.opts.slug_url_kwarg
            }

            fn slug_field(&self) -> &str {
                &self.opts.slug_field
            }

            fn query_pk_and_slug(&self) -> bool {
                self.opts.query_pk_and_slug
            }

            fn context_object_name(&self) -> Option<&str> {
                self.opts.context_object_name.as_deref()
            }

            fn template_name_field(&self) -> Option<&str> {
                self.opts.template_name_field.as_deref()
            }

            fn template_name_suffix(&self) -> &str {
                &self.opts.template_name_suffix
            }
        }
    };
}

pub(crate) use impl_object_view;

/// Displays one object, looked up from the URL's pk or slug.
///
/// # Examples
///
/// ```no_run
/// # use django_async_db::{Manager, Model};
/// # fn demo<M: Model>(objects: Manager<M>) {
/// use django_async_views::DetailView;
///
/// let view = DetailView::new("BookDetail").queryset(objects.all());
/// # }
/// ```
pub struct DetailView<M: Model> {
    opts: ObjectOptions<M>,
}

impl<M: Model> DetailView<M> {
    pub fn new(name: &str) -> Self {
        Self {
            opts: ObjectOptions::new(name, "_detail"),
        }
    }
}

impl_object_view!(DetailView);

#[async_trait]
impl<M: Model> View for DetailView<M> {
    fn view_name(&self) -> &str {
        &self.opts.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        let template_names = self.get_object_template_names(Some(&object))?;
        let context = self
            .get_object_context_data(&request, Some(&object), Context::new())
            .await?;
        self.render_to_response(template_names, context)
    }
}

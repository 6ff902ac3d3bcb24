//! List views over any [`ObjectList`], with optional pagination.

use std::sync::Arc;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::ObjectList;
use django_async_http::{HttpRequest, HttpResponse};
use django_async_template::{Context, Engine};
use http::Method;
use serde_json::{json, Value as JsonValue};

use crate::base::{ContextMixin, TemplateResponseMixin, View};
use crate::pagination::{Page, Paginator};

type ListItem<V> = <<V as MultipleObjectMixin>::List as ObjectList>::Item;

/// Behaviour shared by views that display a list of objects.
#[async_trait]
pub trait MultipleObjectMixin: ContextMixin + TemplateResponseMixin {
    type List: ObjectList;

    /// The configured list. Views that build their list per request
    /// override [`get_queryset`](Self::get_queryset) instead.
    fn queryset(&self) -> Option<&Self::List> {
        None
    }

    /// Whether an empty list is displayed rather than raising a 404.
    fn allow_empty(&self) -> bool {
        true
    }

    fn paginate_by(&self) -> Option<usize> {
        None
    }

    fn paginate_orphans(&self) -> usize {
        0
    }

    /// The URL kwarg or query parameter carrying the page number.
    fn page_kwarg(&self) -> &str {
        "page"
    }

    fn context_object_name(&self) -> Option<&str> {
        None
    }

    fn ordering(&self) -> &[String] {
        &[]
    }

    fn template_name_suffix(&self) -> &str {
        "_list"
    }

    async fn get_queryset(&self, _request: &HttpRequest) -> DjangoResult<Self::List> {
        let list = self.queryset().cloned().ok_or_else(|| {
            let name = self.view_name();
            DjangoError::ImproperlyConfigured(format!(
                "{name} is missing a QuerySet. Define {name}.model, {name}.queryset, or override \
                 {name}.get_queryset()."
            ))
        })?;
        let ordering = self.ordering();
        if ordering.is_empty() {
            Ok(list)
        } else {
            Ok(list.with_ordering(ordering))
        }
    }

    /// The page size, or `None` to disable pagination.
    fn get_paginate_by(&self, _list: &Self::List) -> Option<usize> {
        self.paginate_by()
    }

    fn get_paginator(&self, list: Self::List, per_page: usize) -> Paginator<Self::List> {
        Paginator::new(list, per_page)
            .orphans(self.paginate_orphans())
            .allow_empty_first_page(self.allow_empty())
    }

    /// Picks the requested page: URL kwargs first, then the query string,
    /// then page 1. The token may be `"last"`.
    async fn paginate_queryset(
        &self,
        request: &HttpRequest,
        list: Self::List,
        page_size: usize,
    ) -> DjangoResult<(Paginator<Self::List>, Page<ListItem<Self>>)> {
        let paginator = self.get_paginator(list, page_size);
        let page_kwarg = self.page_kwarg();
        let token = request
            .kwarg(page_kwarg)
            .filter(|s| !s.is_empty())
            .or_else(|| request.get().get(page_kwarg).filter(|s| !s.is_empty()))
            .unwrap_or("1");

        let number = match token.parse::<i64>() {
            Ok(n) => n,
            Err(_) if token == "last" => {
                i64::try_from(paginator.num_pages().await?).unwrap_or(i64::MAX)
            }
            Err(_) => {
                return Err(DjangoError::NotFound(
                    "Page is not 'last', nor can it be converted to an int.".to_string(),
                ))
            }
        };

        match paginator.page(number).await {
            Ok(page) => Ok((paginator, page)),
            Err(err) if err.is_invalid_page() => Err(DjangoError::NotFound(format!(
                "Invalid page ({number}): {err}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn get_context_object_name(&self, list: &Self::List) -> Option<String> {
        self.context_object_name().map(String::from).or_else(|| {
            list.model_meta()
                .map(|meta| format!("{}_list", meta.model_name))
        })
    }

    /// Builds the list context: `paginator`, `page_obj`, `is_paginated`,
    /// `object_list` and the named list, then `extra` and the
    /// [`ContextMixin`] values on top.
    async fn get_list_context_data(
        &self,
        request: &HttpRequest,
        list: Self::List,
        extra: Context,
    ) -> DjangoResult<Context> {
        let context_object_name = self.get_context_object_name(&list);
        let mut context = Context::new();

        let objects = match self.get_paginate_by(&list) {
            Some(page_size) => {
                let (paginator, page) = self.paginate_queryset(request, list, page_size).await?;
                context.insert("paginator".into(), paginator.to_context().await?);
                context.insert("page_obj".into(), page.to_context());
                context.insert("is_paginated".into(), json!(page.has_other_pages()));
                serde_json::to_value(page.object_list())?
            }
            None => {
                context.insert("paginator".into(), JsonValue::Null);
                context.insert("page_obj".into(), JsonValue::Null);
                context.insert("is_paginated".into(), json!(false));
                serde_json::to_value(list.fetch_all().await?)?
            }
        };

        if let Some(name) = context_object_name {
            context.insert(name, objects.clone());
        }
        context.insert("object_list".into(), objects);
        context.extend(extra);
        self.get_context_data(request, context).await
    }

    /// The configured template name, then `<app>/<model><suffix>.html`.
    fn get_list_template_names(&self, list: &Self::List) -> DjangoResult<Vec<String>> {
        let mut names = match self.get_template_names() {
            Ok(names) => names,
            Err(DjangoError::ImproperlyConfigured(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        if let Some(meta) = list.model_meta() {
            names.push(format!(
                "{}/{}{}.html",
                meta.app_label,
                meta.model_name,
                self.template_name_suffix()
            ));
        } else if names.is_empty() {
            return Err(DjangoError::ImproperlyConfigured(format!(
                "{} requires either a 'template_name' attribute or a get_queryset() method that \
                 returns a QuerySet.",
                self.view_name()
            )));
        }
        Ok(names)
    }

    /// The GET flow: fetch the list, enforce `allow_empty`, render.
    async fn list(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let list = self.get_queryset(&request).await?;
        if !self.allow_empty() {
            let is_empty = if self.get_paginate_by(&list).is_some() {
                list.fetch_range(0, 1).await?.is_empty()
            } else {
                list.count().await? == 0
            };
            if is_empty {
                return Err(DjangoError::NotFound(format!(
                    "Empty list and '{}.allow_empty' is False.",
                    self.view_name()
                )));
            }
        }
        let template_names = self.get_list_template_names(&list)?;
        let context = self
            .get_list_context_data(&request, list, Context::new())
            .await?;
        self.render_to_response(template_names, context)
    }
}

/// A generic list view.
///
/// # Examples
///
/// ```
/// use django_async_views::ListView;
///
/// let view = ListView::new("BookList")
///     .queryset(vec!["a", "b", "c"])
///     .template_name("books.html")
///     .paginate_by(2);
/// ```
pub struct ListView<L: ObjectList> {
    name: String,
    queryset: Option<L>,
    template_name: Option<String>,
    template_name_suffix: String,
    engine: Option<Arc<Engine>>,
    extra_context: Option<Context>,
    content_type: Option<String>,
    allow_empty: bool,
    paginate_by: Option<usize>,
    paginate_orphans: usize,
    page_kwarg: String,
    context_object_name: Option<String>,
    ordering: Vec<String>,
}

impl<L: ObjectList> ListView<L> {
    /// Creates a view named `name`. The name appears in error messages.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            queryset: None,
            template_name: None,
            template_name_suffix: "_list".to_string(),
            engine: None,
            extra_context: None,
            content_type: None,
            allow_empty: true,
            paginate_by: None,
            paginate_orphans: 0,
            page_kwarg: "page".to_string(),
            context_object_name: None,
            ordering: Vec::new(),
        }
    }

    #[must_use]
    pub fn queryset(mut self, list: L) -> Self {
        self.queryset = Some(list);
        self
    }

    #[must_use]
    pub fn template_name(mut self, name: &str) -> Self {
        self.template_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn template_name_suffix(mut self, suffix: &str) -> Self {
        self.template_name_suffix = suffix.to_string();
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn extra_context(mut self, context: Context) -> Self {
        self.extra_context = Some(context);
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    #[must_use]
    pub const fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    #[must_use]
    pub const fn paginate_by(mut self, per_page: usize) -> Self {
        self.paginate_by = Some(per_page);
        self
    }

    #[must_use]
    pub const fn paginate_orphans(mut self, orphans: usize) -> Self {
        self.paginate_orphans = orphans;
        self
    }

    #[must_use]
    pub fn page_kwarg(mut self, kwarg: &str) -> Self {
        self.page_kwarg = kwarg.to_string();
        self
    }

    #[must_use]
    pub fn context_object_name(mut self, name: &str) -> Self {
        self.context_object_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn ordering<S: AsRef<str>>(mut self, terms: &[S]) -> Self {
        self.ordering = terms.iter().map(|t| t.as_ref().to_string()).collect();
        self
    }
}

#[async_trait]
impl<L: ObjectList> View for ListView<L> {
    fn view_name(&self) -> &str {
        &self.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.list(request).await
    }
}

impl<L: ObjectList> ContextMixin for ListView<L> {
    fn extra_context(&self) -> Option<&Context> {
        self.extra_context.as_ref()
    }
}

impl<L: ObjectList> TemplateResponseMixin for ListView<L> {
    fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    fn template_engine(&self) -> Option<&Engine> {
        self.engine.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl<L: ObjectList> MultipleObjectMixin for ListView<L> {
    type List = L;

    fn queryset(&self) -> Option<&L> {
        self.queryset.as_ref()
    }

    fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    fn paginate_by(&self) -> Option<usize> {
        self.paginate_by
    }

    fn paginate_orphans(&self) -> usize {
        self.paginate_orphans
    }

    fn page_kwarg(&self) -> &str {
        &self.page_kwarg
    }

    fn context_object_name(&self) -> Option<&str> {
        self.context_object_name.as_deref()
    }

    fn ordering(&self) -> &[String] {
        &self.ordering
    }

    fn template_name_suffix(&self) -> &str {
        &self.template_name_suffix
    }
}

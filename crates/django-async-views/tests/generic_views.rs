//! Generic views over the in-memory backend.
//!
//! Tests cover:
//! 1. ListView over a query set: rendering, pagination and query counts
//! 2. DetailView lookups by pk and slug
//! 3. CreateView / UpdateView form flows
//! 4. DeleteView confirmation and deletion
//! 5. Date archives

use std::sync::{Arc, LazyLock};

use chrono::{Duration, Local, NaiveDate};
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{
    FieldDef, FieldType, FromValue, InMemoryBackend, Lookup, Manager, Model, ModelMeta, OrderBy,
    QueryCounter, Value,
};
use django_async_forms::{ModelFormConfig, ModelFormFields};
use django_async_http::{HttpRequest, QueryDict};
use django_async_template::Engine;
use django_async_views::{
    CreateView, DateArchiveView, DateDetailView, DeleteView, DetailView, ListView,
    SingleObjectMixin, UpdateView, View,
};
use http::{Method, StatusCode};
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
struct Author {
    id: Option<i64>,
    name: String,
    slug: String,
}

impl Model for Author {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "testapp",
            model_name: "author",
            object_name: "Author",
            verbose_name: "author".into(),
            verbose_name_plural: "authors".into(),
            ordering: vec![OrderBy::asc("name")],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("name", FieldType::CharField).max_length(100),
                FieldDef::new("slug", FieldType::SlugField),
            ],
        });
        &META
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::Int)
    }

    fn set_pk(&mut self, value: Value) {
        self.id = value.as_int();
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "slug" => Some(self.slug.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "name" => self.name = FromValue::from_value(&value)?,
            "slug" => self.slug = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }

    fn get_absolute_url(&self) -> Option<String> {
        self.id.map(|id| format!("/authors/{id}/"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
struct Book {
    id: Option<i64>,
    name: String,
    pubdate: Option<NaiveDate>,
}

impl Model for Book {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "testapp",
            model_name: "book",
            object_name: "Book",
            verbose_name: "book".into(),
            verbose_name_plural: "books".into(),
            ordering: vec![OrderBy::desc("pubdate")],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("name", FieldType::CharField).max_length(100),
                FieldDef::new("pubdate", FieldType::DateField),
            ],
        });
        &META
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::Int)
    }

    fn set_pk(&mut self, value: Value) {
        self.id = value.as_int();
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "pubdate" => Some(self.pubdate.into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "name" => self.name = FromValue::from_value(&value)?,
            "pubdate" => self.pubdate = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }
}

async fn authors(n: usize) -> (Arc<InMemoryBackend<Author>>, Manager<Author>) {
    let backend = Arc::new(InMemoryBackend::new());
    let objects = Manager::new(backend.clone());
    for i in 1..=n {
        objects
            .create(Author {
                id: None,
                name: format!("Author {i:03}"),
                slug: format!("author-{i:03}"),
            })
            .await
            .unwrap();
    }
    backend.reset_query_count();
    (backend, objects)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn books() -> (Arc<InMemoryBackend<Book>>, Manager<Book>) {
    let backend = Arc::new(InMemoryBackend::new());
    let objects = Manager::new(backend.clone());
    let future = Local::now().date_naive() + Duration::days(60);
    for (name, pubdate) in [
        ("Dreaming in Code", date(2006, 5, 1)),
        ("Zen of Python", date(2008, 10, 1)),
        ("Django Unleashed", date(2008, 10, 15)),
        ("Two Scoops", date(2008, 11, 3)),
        ("Next Edition", future),
    ] {
        objects
            .create(Book {
                id: None,
                name: name.into(),
                pubdate: Some(pubdate),
            })
            .await
            .unwrap();
    }
    backend.reset_query_count();
    (backend, objects)
}

fn get() -> HttpRequest {
    HttpRequest::builder().build()
}

fn post(body: &str) -> HttpRequest {
    HttpRequest::builder()
        .method(Method::POST)
        .form(&QueryDict::parse(body))
        .build()
}

fn with_kwargs(request: HttpRequest, kwargs: &[(&str, &str)]) -> HttpRequest {
    let mut request = request;
    request.set_kwargs(
        kwargs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    );
    request
}

// ============================================================================
// 1. ListView
// ============================================================================

#[tokio::test]
async fn test_list_view_renders_model_template() {
    let (_, objects) = authors(3).await;
    let engine = Arc::new(Engine::new());
    engine
        .add_string_template(
            "testapp/author_list.html",
            "{% for a in author_list %}{{ a.name }};{% endfor %}",
        )
        .unwrap();
    let view = ListView::new("AuthorList").queryset(objects.all()).engine(engine);
    let response = view.dispatch(get()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "Author 001;Author 002;Author 003;");
    assert_eq!(response.template_name(), ["testapp/author_list.html"]);
}

#[tokio::test]
async fn test_list_view_template_name_comes_first() {
    let (_, objects) = authors(1).await;
    let view = ListView::new("AuthorList")
        .queryset(objects.all())
        .template_name("custom.html");
    let response = view.dispatch(get()).await.unwrap();
    assert_eq!(
        response.template_name(),
        ["custom.html", "testapp/author_list.html"]
    );
}

#[tokio::test]
async fn test_paginated_list_counts_once_and_fetches_once() {
    let (backend, objects) = authors(100).await;
    let view = ListView::new("AuthorList").queryset(objects.all()).paginate_by(30);
    let request = HttpRequest::builder().query_string("page=2").build();
    let response = view.dispatch(request).await.unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["page_obj"]["number"], 2);
    assert_eq!(ctx["page_obj"]["start_index"], 31);
    assert_eq!(ctx["author_list"][0]["name"], "Author 031");
    assert_eq!(ctx["author_list"].as_array().unwrap().len(), 30);
    assert_eq!(backend.query_count(), 2);
}

#[tokio::test]
async fn test_paginated_list_last_page() {
    let (_, objects) = authors(100).await;
    let view = ListView::new("AuthorList").queryset(objects.all()).paginate_by(30);
    let request = HttpRequest::builder().query_string("page=last").build();
    let ctx = view.dispatch(request).await.unwrap();
    let ctx = ctx.context_data().unwrap();
    assert_eq!(ctx["page_obj"]["number"], 4);
    assert_eq!(ctx["object_list"][0]["name"], "Author 091");
    assert_eq!(ctx["object_list"].as_array().unwrap().len(), 10);
    assert_eq!(ctx["object_list"][9]["name"], "Author 100");
}

#[tokio::test]
async fn test_list_view_ordering_and_filtering() {
    let (_, objects) = authors(5).await;
    let view = ListView::new("AuthorList")
        .queryset(objects.filter(Lookup::gte("id", 3)))
        .ordering(&["-name"]);
    let response = view.dispatch(get()).await.unwrap();
    let names: Vec<_> = response.context_data().unwrap()["object_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Author 005", "Author 004", "Author 003"]);
}

#[tokio::test]
async fn test_empty_list_not_allowed() {
    let (_, objects) = authors(0).await;
    let view = ListView::new("AuthorList")
        .queryset(objects.all())
        .allow_empty(false);
    let handler = view.as_view();
    let response = handler(get()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// 2. DetailView
// ============================================================================

#[tokio::test]
async fn test_detail_by_pk() {
    let (_, objects) = authors(2).await;
    let view = DetailView::new("AuthorDetail").queryset(objects.all());
    let response = view
        .dispatch(with_kwargs(get(), &[("pk", "2")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["author"]["name"], "Author 002");
    assert_eq!(ctx["object"], ctx["author"]);
    assert_eq!(response.template_name(), ["testapp/author_detail.html"]);
}

#[tokio::test]
async fn test_detail_by_slug_and_custom_names() {
    let (_, objects) = authors(2).await;
    let view = DetailView::new("AuthorDetail")
        .queryset(objects.all())
        .context_object_name("thing")
        .template_name_suffix("_view");
    let response = view
        .dispatch(with_kwargs(get(), &[("slug", "author-001")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["thing"]["id"], 1);
    assert!(ctx.get("author").is_none());
    assert_eq!(response.template_name(), ["testapp/author_view.html"]);
}

#[tokio::test]
async fn test_detail_pk_and_slug() {
    let (_, objects) = authors(2).await;
    let view = DetailView::new("AuthorDetail")
        .queryset(objects.all())
        .query_pk_and_slug(true);
    let ok = view
        .dispatch(with_kwargs(get(), &[("pk", "1"), ("slug", "author-001")]))
        .await;
    assert!(ok.is_ok());
    let err = view
        .dispatch(with_kwargs(get(), &[("pk", "1"), ("slug", "author-002")]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DjangoError::NotFound(ref m) if m == "No author found matching the query"
    ));

    // Without query_pk_and_slug the slug is ignored once a pk is given.
    let loose = DetailView::new("AuthorDetail").queryset(objects.all());
    assert!(loose
        .dispatch(with_kwargs(get(), &[("pk", "1"), ("slug", "author-002")]))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_detail_errors() {
    let (_, objects) = authors(1).await;
    let view = DetailView::new("AuthorDetail").queryset(objects.all());

    let err = view.dispatch(with_kwargs(get(), &[("pk", "99")])).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = view.dispatch(with_kwargs(get(), &[("pk", "abc")])).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = view.dispatch(get()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Improperly configured: Generic detail view AuthorDetail must be called with either an \
         object pk or a slug in the URLconf."
    );

    let unconfigured: DetailView<Author> = DetailView::new("AuthorDetail");
    let err = unconfigured
        .dispatch(with_kwargs(get(), &[("pk", "1")]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("AuthorDetail is missing a QuerySet"));
}

#[tokio::test]
async fn test_detail_renders_template() {
    let (_, objects) = authors(1).await;
    let engine = Arc::new(Engine::new());
    engine
        .add_string_template("testapp/author_detail.html", "<h1>{{ author.name }}</h1>")
        .unwrap();
    let view = DetailView::new("AuthorDetail").queryset(objects.all()).engine(engine);
    let response = view.as_view()(with_kwargs(get(), &[("pk", "1")])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "<h1>Author 001</h1>");
}

// ============================================================================
// 3. CreateView / UpdateView
// ============================================================================

#[tokio::test]
async fn test_create_view_get_shows_unbound_form() {
    let (_, objects) = authors(0).await;
    let view = CreateView::new("AuthorCreate")
        .queryset(objects.all())
        .fields(&["name", "slug"]);
    let response = view.dispatch(get()).await.unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["form"]["is_bound"], false);
    assert_eq!(ctx["form"]["fields"][0]["name"], "name");
    assert!(ctx.get("object").is_none());
    assert_eq!(response.template_name(), ["testapp/author_form.html"]);
}

#[tokio::test]
async fn test_create_view_post_saves_and_redirects() {
    let (backend, objects) = authors(0).await;
    let view = CreateView::new("AuthorCreate")
        .queryset(objects.all())
        .fields(&["name", "slug"])
        .success_url("/edit/authors/{id}/");
    let response = view.dispatch(post("name=Randall+Munroe&slug=randall-munroe")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.location(), Some("/edit/authors/1/"));
    let stored = backend.snapshot().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Randall Munroe");
}

#[tokio::test]
async fn test_create_view_uses_absolute_url() {
    let (_, objects) = authors(0).await;
    let view = CreateView::new("AuthorCreate")
        .queryset(objects.all())
        .all_fields();
    let response = view.dispatch(post("name=Ada&slug=ada")).await.unwrap();
    assert_eq!(response.location(), Some("/authors/1/"));
}

#[tokio::test]
async fn test_create_view_invalid_post_rerenders() {
    let (backend, objects) = authors(0).await;
    let view = CreateView::new("AuthorCreate")
        .queryset(objects.all())
        .fields(&["name", "slug"])
        .success_url("/authors/");
    let response = view.dispatch(post("name=A&slug=not+a+slug")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["form"]["is_bound"], true);
    assert!(ctx["form"]["errors"]["slug"].is_array());
    assert!(backend.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_create_view_configuration_errors() {
    let (_, objects) = authors(0).await;

    let neither = CreateView::new("AuthorCreate").queryset(objects.all());
    let err = neither.dispatch(get()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Improperly configured: Using ModelFormMixin (base class of AuthorCreate) without the \
         'fields' attribute is prohibited."
    );

    let both = CreateView::new("AuthorCreate")
        .queryset(objects.all())
        .fields(&["name"])
        .form_class(ModelFormConfig::new(Author::meta()));
    let err = both.dispatch(get()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Improperly configured: Specifying both 'fields' and 'form_class' is not permitted."
    );

    let (_, books) = books().await;
    let no_url = CreateView::new("BookCreate")
        .queryset(books.all())
        .form_class(
            ModelFormConfig::new(Book::meta()).with_fields(ModelFormFields::include(&["name"])),
        );
    let err = no_url.dispatch(post("name=Untitled")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Improperly configured: No URL to redirect to. Either provide a url or define a \
         get_absolute_url method on the Model."
    );
}

#[tokio::test]
async fn test_update_view_get_shows_instance() {
    let (_, objects) = authors(2).await;
    let view = UpdateView::new("AuthorUpdate")
        .queryset(objects.all())
        .fields(&["name", "slug"]);
    let response = view
        .dispatch(with_kwargs(get(), &[("pk", "2")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["form"]["fields"][0]["value"], "Author 002");
    assert_eq!(ctx["author"]["id"], 2);
    assert_eq!(response.template_name(), ["testapp/author_form.html"]);
}

#[tokio::test]
async fn test_update_view_post_updates() {
    let (backend, objects) = authors(2).await;
    let view = UpdateView::new("AuthorUpdate")
        .queryset(objects.all())
        .fields(&["name"])
        .success_url("/list/authors/");
    let response = view
        .dispatch(with_kwargs(post("name=Renamed"), &[("pk", "1")]))
        .await
        .unwrap();
    assert_eq!(response.location(), Some("/list/authors/"));
    let stored = backend.snapshot().await;
    assert_eq!(stored.len(), 2);
    let renamed = stored.iter().find(|a| a.id == Some(1)).unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.slug, "author-001");
}

#[tokio::test]
async fn test_update_view_invalid_keeps_object_in_context() {
    let (_, objects) = authors(1).await;
    let view = UpdateView::new("AuthorUpdate")
        .queryset(objects.all())
        .fields(&["name"])
        .success_url("/authors/");
    let response = view
        .dispatch(with_kwargs(post("name="), &[("pk", "1")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["object"]["name"], "Author 001");
    assert_eq!(ctx["form"]["errors"]["name"][0], "This field is required.");
}

fn object_view<V: View + SingleObjectMixin>(view: &V) -> &str {
    view.pk_url_kwarg()
}

#[test]
fn test_edit_views_share_object_mixin_bounds() {
    let create: CreateView<Author> = CreateView::new("AuthorCreate").pk_url_kwarg("id");
    let update: UpdateView<Author> = UpdateView::new("AuthorUpdate").slug_field("slug");
    assert_eq!(object_view(&create), "id");
    assert_eq!(object_view(&update), "pk");
}

#[tokio::test]
async fn test_update_view_missing_object() {
    let (_, objects) = authors(1).await;
    let view = UpdateView::new("AuthorUpdate")
        .queryset(objects.all())
        .fields(&["name"]);
    let response = view.as_view()(with_kwargs(post("name=x"), &[("pk", "7")])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// 4. DeleteView
// ============================================================================

#[tokio::test]
async fn test_delete_view_get_confirms() {
    let (backend, objects) = authors(1).await;
    let view = DeleteView::new("AuthorDelete")
        .queryset(objects.all())
        .success_url("/authors/");
    let response = view
        .dispatch(with_kwargs(get(), &[("pk", "1")]))
        .await
        .unwrap();
    assert_eq!(response.template_name(), ["testapp/author_confirm_delete.html"]);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["author"]["name"], "Author 001");
    assert_eq!(ctx["form"]["is_bound"], false);
    assert_eq!(backend.snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_delete_view_post_deletes_and_interpolates() {
    let (backend, objects) = authors(2).await;
    let view = DeleteView::new("AuthorDelete")
        .queryset(objects.all())
        .success_url("/authors/?deleted={slug}");
    let response = view
        .dispatch(with_kwargs(post(""), &[("pk", "1")]))
        .await
        .unwrap();
    assert_eq!(response.location(), Some("/authors/?deleted=author-001"));
    let stored = backend.snapshot().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, Some(2));
}

#[tokio::test]
async fn test_delete_view_delete_method() {
    let (backend, objects) = authors(1).await;
    let view = DeleteView::new("AuthorDelete")
        .queryset(objects.all())
        .success_url("/authors/");
    let request = with_kwargs(
        HttpRequest::builder().method(Method::DELETE).build(),
        &[("pk", "1")],
    );
    let response = view.dispatch(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(backend.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_delete_view_without_success_url_deletes_nothing() {
    let (backend, objects) = authors(1).await;
    let view = DeleteView::new("AuthorDelete").queryset(objects.all());
    let err = view
        .dispatch(with_kwargs(post(""), &[("pk", "1")]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Improperly configured: No URL to redirect to. Provide a success_url."
    );
    assert_eq!(backend.snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_delete_view_invalid_confirmation() {
    use django_async_forms::{FormFieldDef, FormFieldType};

    let (backend, objects) = authors(1).await;
    let view = DeleteView::new("AuthorDelete")
        .queryset(objects.all())
        .success_url("/authors/")
        .confirm_fields(vec![FormFieldDef::new("confirm", FormFieldType::Boolean)]);
    let response = view
        .dispatch(with_kwargs(post(""), &[("pk", "1")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["form"]["is_bound"], true);
    assert_eq!(backend.snapshot().await.len(), 1);

    let response = view
        .dispatch(with_kwargs(post("confirm=on"), &[("pk", "1")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(backend.snapshot().await.is_empty());
}

// ============================================================================
// 5. Date archives
// ============================================================================

#[tokio::test]
async fn test_archive_index() {
    let (_, objects) = books().await;
    let view = DateArchiveView::archive_index("BookArchive", "pubdate").queryset(objects.all());
    let response = view.dispatch(get()).await.unwrap();
    assert_eq!(response.template_name(), ["testapp/book_archive.html"]);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["date_list"], json!(["2008-01-01", "2006-01-01"]));
    assert_eq!(ctx["latest"].as_array().unwrap().len(), 4);
    assert_eq!(ctx["latest"][0]["name"], "Two Scoops");
}

#[tokio::test]
async fn test_archive_index_allow_future() {
    let (_, objects) = books().await;
    let view = DateArchiveView::archive_index("BookArchive", "pubdate")
        .queryset(objects.all())
        .allow_future(true);
    let response = view.dispatch(get()).await.unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["latest"].as_array().unwrap().len(), 5);
    assert_eq!(ctx["latest"][0]["name"], "Next Edition");
}

#[tokio::test]
async fn test_archive_empty_is_404_unless_allowed() {
    let (_, objects) = books().await;
    let view = DateArchiveView::year("BookYear", "pubdate").queryset(objects.all());
    let err = view
        .dispatch(with_kwargs(get(), &[("year", "1999")]))
        .await
        .unwrap_err();
    assert!(matches!(err, DjangoError::NotFound(ref m) if m == "No books available"));

    let allowed = DateArchiveView::year("BookYear", "pubdate")
        .queryset(objects.all())
        .allow_empty(true);
    let response = allowed
        .dispatch(with_kwargs(get(), &[("year", "1999")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["date_list"], json!([]));
    assert_eq!(ctx["next_year"], "2000-01-01");
    assert_eq!(ctx["previous_year"], "1998-01-01");
}

#[tokio::test]
async fn test_year_archive() {
    let (_, objects) = books().await;
    let view = DateArchiveView::year("BookYear", "pubdate").queryset(objects.all());
    let response = view
        .dispatch(with_kwargs(get(), &[("year", "2008")]))
        .await
        .unwrap();
    assert_eq!(response.template_name(), ["testapp/book_archive_year.html"]);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["date_list"], json!(["2008-10-01", "2008-11-01"]));
    assert_eq!(ctx["year"], "2008-01-01");
    assert_eq!(ctx["book_list"], json!([]));
    assert_eq!(ctx["previous_year"], "2006-01-01");
    assert!(ctx["next_year"].is_null());

    let listed = DateArchiveView::year("BookYear", "pubdate")
        .queryset(objects.all())
        .make_object_list(true);
    let response = listed
        .dispatch(with_kwargs(get(), &[("year", "2008")]))
        .await
        .unwrap();
    assert_eq!(
        response.context_data().unwrap()["book_list"].as_array().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_month_archive() {
    let (_, objects) = books().await;
    let view = DateArchiveView::month("BookMonth", "pubdate").queryset(objects.all());
    let response = view
        .dispatch(with_kwargs(get(), &[("year", "2008"), ("month", "oct")]))
        .await
        .unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["month"], "2008-10-01");
    assert_eq!(ctx["date_list"], json!(["2008-10-01", "2008-10-15"]));
    assert_eq!(ctx["book_list"].as_array().unwrap().len(), 2);
    assert_eq!(ctx["next_month"], "2008-11-01");
    assert_eq!(ctx["previous_month"], "2006-05-01");

    let err = view
        .dispatch(with_kwargs(get(), &[("year", "2008"), ("month", "foo")]))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_day_archive() {
    let (_, objects) = books().await;
    let view = DateArchiveView::day("BookDay", "pubdate").queryset(objects.all());
    let response = view
        .dispatch(with_kwargs(
            get(),
            &[("year", "2008"), ("month", "10"), ("day", "15")],
        ))
        .await
        .unwrap();
    assert_eq!(response.template_name(), ["testapp/book_archive_day.html"]);
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["book_list"][0]["name"], "Django Unleashed");
    assert_eq!(ctx["previous_day"], "2008-10-01");
    assert_eq!(ctx["next_day"], "2008-11-03");
    assert!(ctx["date_list"].is_null());
}

#[tokio::test]
async fn test_paginated_archive() {
    let (_, objects) = books().await;
    let view = DateArchiveView::archive_index("BookArchive", "pubdate")
        .queryset(objects.all())
        .paginate_by(3);
    let request = HttpRequest::builder().query_string("page=2").build();
    let response = view.dispatch(request).await.unwrap();
    let ctx = response.context_data().unwrap();
    assert_eq!(ctx["is_paginated"], true);
    assert_eq!(ctx["latest"][0]["name"], "Dreaming in Code");
}

#[tokio::test]
async fn test_date_detail() {
    let (_, objects) = books().await;
    let view = DateDetailView::new("BookDetail", "pubdate").queryset(objects.all());
    let response = view
        .dispatch(with_kwargs(
            get(),
            &[("year", "2008"), ("month", "oct"), ("day", "1"), ("pk", "2")],
        ))
        .await
        .unwrap();
    assert_eq!(response.context_data().unwrap()["book"]["name"], "Zen of Python");
    assert_eq!(response.template_name(), ["testapp/book_detail.html"]);

    let err = view
        .dispatch(with_kwargs(
            get(),
            &[("year", "2008"), ("month", "oct"), ("day", "2"), ("pk", "2")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, DjangoError::NotFound(ref m) if m == "No book found matching the query"));
}

#[tokio::test]
async fn test_date_detail_future() {
    let (_, objects) = books().await;
    let future = Local::now().date_naive() + Duration::days(60);
    let (y, m, d) = (
        future.format("%Y").to_string(),
        future.format("%m").to_string(),
        future.format("%d").to_string(),
    );
    let kwargs = [("year", y.as_str()), ("month", m.as_str()), ("day", d.as_str()), ("pk", "5")];

    let view = DateDetailView::new("BookDetail", "pubdate").queryset(objects.all());
    let err = view.dispatch(with_kwargs(get(), &kwargs)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not found: Future books not available because BookDetail.allow_future is False."
    );

    let allowed = DateDetailView::new("BookDetail", "pubdate")
        .queryset(objects.all())
        .allow_future(true);
    assert!(allowed.dispatch(with_kwargs(get(), &kwargs)).await.is_ok());
}

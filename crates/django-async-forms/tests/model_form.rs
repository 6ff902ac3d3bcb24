//! ModelForm binding, validation and async save against the in-memory backend.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{
    FieldDef, FieldType, FromValue, InMemoryBackend, Lookup, Manager, Model, ModelMeta,
    QueryCounter, Value,
};
use django_async_forms::{Form, ModelForm, ModelFormConfig, ModelFormFields, NON_FIELD_ERRORS};
use django_async_http::QueryDict;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
struct Article {
    id: Option<i64>,
    headline: String,
    slug: String,
    rating: i64,
    notes: String,
}

impl Model for Article {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "news",
            model_name: "article",
            object_name: "Article",
            verbose_name: "article".into(),
            verbose_name_plural: "articles".into(),
            ordering: vec![],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("headline", FieldType::CharField).max_length(40),
                FieldDef::new("slug", FieldType::SlugField).blank(),
                FieldDef::new("rating", FieldType::IntegerField).default(3),
                FieldDef::new("notes", FieldType::TextField).blank(),
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
            "headline" => Some(self.headline.clone().into()),
            "slug" => Some(self.slug.clone().into()),
            "rating" => Some(self.rating.into()),
            "notes" => Some(self.notes.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "headline" => self.headline = FromValue::from_value(&value)?,
            "slug" => self.slug = FromValue::from_value(&value)?,
            "rating" => self.rating = FromValue::from_value(&value)?,
            "notes" => self.notes = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
struct Listing {
    id: Option<i64>,
    slug: String,
    price: i64,
    quantity: i64,
    code: String,
    warehouse: Option<i64>,
}

impl Model for Listing {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "shop",
            model_name: "listing",
            object_name: "Listing",
            verbose_name: "listing".into(),
            verbose_name_plural: "listings".into(),
            ordering: vec![],
            unique_together: vec![vec!["price", "quantity"], vec!["code", "warehouse"]],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("slug", FieldType::SlugField).unique(),
                FieldDef::new("price", FieldType::IntegerField),
                FieldDef::new("quantity", FieldType::IntegerField),
                FieldDef::new("code", FieldType::CharField).blank(),
                FieldDef::new("warehouse", FieldType::IntegerField).nullable().blank(),
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
            "slug" => Some(self.slug.clone().into()),
            "price" => Some(self.price.into()),
            "quantity" => Some(self.quantity.into()),
            "code" => Some(self.code.clone().into()),
            "warehouse" => Some(self.warehouse.into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "slug" => self.slug = FromValue::from_value(&value)?,
            "price" => self.price = FromValue::from_value(&value)?,
            "quantity" => self.quantity = FromValue::from_value(&value)?,
            "code" => self.code = FromValue::from_value(&value)?,
            "warehouse" => self.warehouse = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }
}

fn setup() -> (Arc<InMemoryBackend<Article>>, Manager<Article>) {
    let backend = Arc::new(InMemoryBackend::new());
    let objects = Manager::new(backend.clone());
    (backend, objects)
}

fn config(fields: &[&str]) -> ModelFormConfig {
    ModelFormConfig::new(Article::meta()).with_fields(ModelFormFields::include(fields))
}

#[tokio::test]
async fn test_create_assigns_pk() {
    let (backend, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline", "slug"]), objects.clone(), None).unwrap();
    assert!(form.is_adding());
    form.bind(&QueryDict::parse("headline=Hello&slug=hello"));
    let saved = form.save(true).await.unwrap();
    assert_eq!(saved.id, Some(1));
    assert_eq!(saved.headline, "Hello");
    assert_eq!(saved.rating, 0);
    assert_eq!(backend.snapshot().await, vec![saved.clone()]);
    assert_eq!(form.instance(), &saved);
}

#[tokio::test]
async fn test_invalid_create_fails_with_value_error() {
    let (backend, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline"]), objects, None).unwrap();
    form.bind(&QueryDict::parse("headline="));
    let err = form.save(true).await.unwrap_err();
    assert!(matches!(
        err,
        DjangoError::ValueError(ref m)
            if m == "The Article could not be created because the data didn't validate."
    ));
    assert_eq!(form.errors()["headline"], vec!["This field is required."]);
    assert!(backend.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_invalid_update_says_changed() {
    let (_, objects) = setup();
    let existing = objects
        .create(Article {
            headline: "Old".into(),
            ..Article::default()
        })
        .await
        .unwrap();
    let mut form = ModelForm::new(&config(&["slug"]), objects, Some(existing)).unwrap();
    form.bind(&QueryDict::parse("slug=not+a+slug"));
    assert!(!form.is_valid().await);
    let err = form.save(true).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The Article could not be changed because the data didn't validate."
    );
}

#[tokio::test]
async fn test_commit_false_leaves_store_untouched() {
    let (backend, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline"]), objects, None).unwrap();
    form.bind(&QueryDict::parse("headline=Draft"));
    assert!(form.is_valid().await);
    backend.reset_query_count();
    let unsaved = form.save(false).await.unwrap();
    assert_eq!(unsaved.id, None);
    assert_eq!(unsaved.headline, "Draft");
    assert_eq!(backend.query_count(), 0);
    assert!(backend.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_update_only_touches_form_fields() {
    let (_, objects) = setup();
    let existing = objects
        .create(Article {
            headline: "Before".into(),
            slug: "before".into(),
            rating: 5,
            notes: "keep me".into(),
            ..Article::default()
        })
        .await
        .unwrap();

    let mut form = ModelForm::new(&config(&["headline", "slug"]), objects.clone(), Some(existing.clone())).unwrap();
    assert!(!form.is_adding());
    assert_eq!(form.initial()["headline"], Value::from("Before"));

    form.bind(&QueryDict::parse("headline=After&slug=after"));
    let saved = form.save(true).await.unwrap();
    assert_eq!(saved.id, existing.id);

    let reloaded = objects.get(Lookup::exact("id", existing.id)).await.unwrap();
    assert_eq!(reloaded.headline, "After");
    assert_eq!(reloaded.notes, "keep me");
    assert_eq!(reloaded.rating, 5);
    assert_eq!(objects.all().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_omitted_field_with_default_keeps_instance_value() {
    let (_, objects) = setup();
    let existing = objects
        .create(Article {
            headline: "Rated".into(),
            rating: 9,
            ..Article::default()
        })
        .await
        .unwrap();
    let mut form = ModelForm::new(&config(&["headline", "rating"]), objects, Some(existing)).unwrap();
    form.bind(&QueryDict::parse("headline=Still+rated"));
    let instance = form.save(false).await.unwrap();
    assert_eq!(instance.rating, 9);
    assert_eq!(instance.headline, "Still rated");
}

#[tokio::test]
async fn test_blank_text_field_saves_empty_string() {
    let (_, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline", "notes"]), objects, None).unwrap();
    form.bind(&QueryDict::parse("headline=H&notes="));
    let saved = form.save(true).await.unwrap();
    assert_eq!(saved.notes, "");
}

#[tokio::test]
async fn test_explicit_initial_overrides_instance() {
    let (_, objects) = setup();
    let existing = Article {
        id: Some(4),
        headline: "From instance".into(),
        ..Article::default()
    };
    let form = ModelForm::new(&config(&["headline"]), objects, Some(existing))
        .unwrap()
        .with_initial(HashMap::from([("headline".to_string(), Value::from("Override"))]));
    let ctx = form.as_context();
    assert_eq!(ctx["fields"][0]["value"], "Override");
    assert_eq!(ctx["instance"]["id"], 4);
}

#[tokio::test]
async fn test_clean_hook_blocks_save() {
    let (backend, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline", "slug"]), objects, None)
        .unwrap()
        .with_clean(|data| {
            if data.get("slug") == Some(&Value::from("admin")) {
                Err(HashMap::from([(
                    NON_FIELD_ERRORS.to_string(),
                    vec!["Reserved slug.".to_string()],
                )]))
            } else {
                Ok(())
            }
        });
    form.bind(&QueryDict::parse("headline=H&slug=admin"));
    assert!(form.save(true).await.is_err());
    assert_eq!(form.non_field_errors(), ["Reserved slug."]);
    assert!(backend.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_add_error_after_validation_blocks_save() {
    let (_, objects) = setup();
    let mut form = ModelForm::new(&config(&["headline"]), objects, None).unwrap();
    form.bind(&QueryDict::parse("headline=Fine"));
    assert!(form.is_valid().await);
    form.add_error(Some("headline"), "Duplicate headline.".to_string());
    assert!(form.save(true).await.is_err());
}

// ============================================================================
// Uniqueness
// ============================================================================

fn listings() -> (ModelFormConfig, Manager<Listing>) {
    let config = ModelFormConfig::new(Listing::meta());
    let objects = Manager::new(Arc::new(InMemoryBackend::new()));
    (config, objects)
}

async fn submit(
    config: &ModelFormConfig,
    objects: &Manager<Listing>,
    instance: Option<Listing>,
    data: &str,
) -> ModelForm<Listing> {
    let mut form = ModelForm::new(config, objects.clone(), instance).unwrap();
    form.bind(&QueryDict::parse(data));
    form.is_valid().await;
    form
}

#[tokio::test]
async fn test_unique_field_clash() {
    let (config, objects) = listings();
    let mut form = submit(&config, &objects, None, "slug=teddy-bear-blue&price=6&quantity=1").await;
    assert!(form.errors().is_empty());
    let saved = form.save(true).await.unwrap();

    let mut form = submit(&config, &objects, None, "slug=teddy-bear-blue&price=7&quantity=1").await;
    assert!(!form.is_valid().await);
    assert_eq!(form.errors().len(), 1);
    assert_eq!(
        form.errors()["slug"],
        vec!["Listing with this Slug already exists."]
    );
    let err = match form.validate_unique().await {
        Err(DjangoError::ValidationError(err)) => err,
        other => panic!("expected a validation error, got {other:?}"),
    };
    assert_eq!(err.field_errors["slug"][0].code, "unique");

    let form = submit(&config, &objects, Some(saved), "slug=teddy-bear-blue&price=6&quantity=1").await;
    assert!(form.errors().is_empty());
}

#[tokio::test]
async fn test_unique_together_clash_is_a_non_field_error() {
    let (config, objects) = listings();
    let mut form = submit(&config, &objects, None, "slug=a&price=6&quantity=1").await;
    form.save(true).await.unwrap();

    let form = submit(&config, &objects, None, "slug=b&price=6&quantity=1").await;
    assert_eq!(form.errors().len(), 1);
    assert_eq!(
        form.non_field_errors(),
        ["Listing with this Price and Quantity already exists."]
    );

    let form = submit(&config, &objects, None, "slug=b&price=6&quantity=2").await;
    assert!(form.errors().is_empty());
}

#[tokio::test]
async fn test_unique_together_skipped_when_partly_off_the_form() {
    let (config, objects) = listings();
    let mut form = submit(&config, &objects, None, "slug=a&price=6&quantity=1").await;
    form.save(true).await.unwrap();

    let partial = config.with_fields(ModelFormFields::include(&["slug", "price"]));
    let mut form = ModelForm::new(&partial, objects.clone(), None).unwrap();
    form.bind(&QueryDict::parse("slug=b&price=6"));
    assert!(form.is_valid().await, "{:?}", form.errors());
}

#[tokio::test]
async fn test_null_values_never_clash() {
    let (config, objects) = listings();
    for (slug, price) in [("a", 1), ("b", 2)] {
        let data = format!("slug={slug}&price={price}&quantity=1&code=X");
        let mut form = submit(&config, &objects, None, &data).await;
        form.save(true).await.unwrap();
    }

    let mut form = submit(&config, &objects, None, "slug=c&price=3&quantity=1&code=X&warehouse=5").await;
    form.save(true).await.unwrap();
    let form = submit(&config, &objects, None, "slug=d&price=4&quantity=1&code=X&warehouse=5").await;
    assert_eq!(
        form.errors()[NON_FIELD_ERRORS],
        vec!["Listing with this Code and Warehouse already exists."]
    );
}

#[tokio::test]
async fn test_failed_fields_skip_their_uniqueness_sets() {
    let (config, objects) = listings();
    let mut form = submit(&config, &objects, None, "slug=a&price=6&quantity=1").await;
    form.save(true).await.unwrap();

    let form = submit(&config, &objects, None, "slug=a&price=six&quantity=1").await;
    assert_eq!(form.errors()["slug"], vec!["Listing with this Slug already exists."]);
    assert_eq!(form.errors()["price"], vec!["Enter a whole number."]);
    assert!(!form.errors().contains_key(NON_FIELD_ERRORS));
}

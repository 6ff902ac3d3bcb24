//! QuerySet and Manager behaviour over the in-memory backend.

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{
    DatePeriod, FieldDef, FieldType, FromValue, InMemoryBackend, Lookup, Manager, Model,
    ModelMeta, ObjectList, OrderBy, QueryCounter, Value,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct Book {
    id: Option<i64>,
    title: String,
    pages: i64,
    published: NaiveDate,
}

impl Model for Book {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "library",
            model_name: "book",
            object_name: "Book",
            verbose_name: "book".into(),
            verbose_name_plural: "books".into(),
            ordering: vec![OrderBy::asc("title")],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("title", FieldType::CharField).max_length(100),
                FieldDef::new("pages", FieldType::IntegerField),
                FieldDef::new("published", FieldType::DateField),
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
            "title" => Some(self.title.clone().into()),
            "pages" => Some(self.pages.into()),
            "published" => Some(self.published.into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "title" => self.title = FromValue::from_value(&value)?,
            "pages" => self.pages = FromValue::from_value(&value)?,
            "published" => self.published = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }
}

fn book(title: &str, pages: i64, y: i32, m: u32, d: u32) -> Book {
    Book {
        id: None,
        title: title.to_string(),
        pages,
        published: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
    }
}

async fn seeded() -> (Arc<InMemoryBackend<Book>>, Manager<Book>) {
    let backend = Arc::new(InMemoryBackend::new());
    let objects = Manager::new(backend.clone());
    for b in [
        book("Dune", 412, 1965, 8, 1),
        book("Anathem", 937, 2008, 9, 9),
        book("Carrie", 199, 1974, 4, 5),
        book("Bleak House", 928, 1853, 3, 1),
    ] {
        objects.create(b).await.unwrap();
    }
    backend.reset_query_count();
    (backend, objects)
}

#[tokio::test]
async fn test_create_assigns_increasing_pks() {
    let (_, objects) = seeded().await;
    let created = objects.create(book("Emma", 474, 1815, 12, 23)).await.unwrap();
    assert_eq!(created.id, Some(5));
}

#[tokio::test]
async fn test_meta_ordering_applies_by_default() {
    let (backend, objects) = seeded().await;
    let titles: Vec<String> = objects
        .all()
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, ["Anathem", "Bleak House", "Carrie", "Dune"]);
    assert_eq!(backend.query_count(), 1);
}

#[tokio::test]
async fn test_filter_order_and_slice() {
    let (_, objects) = seeded().await;
    let qs = objects
        .filter(Lookup::gt("pages", 300))
        .order_by(&["-pages"])
        .slice(1, Some(3));
    let titles: Vec<String> = qs.fetch_all().await.unwrap().into_iter().map(|b| b.title).collect();
    assert_eq!(titles, ["Bleak House", "Dune"]);
    assert_eq!(qs.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_nested_slices_compose() {
    let (_, objects) = seeded().await;
    let qs = objects.all().slice(1, Some(4)).slice(1, Some(5));
    assert_eq!(qs.query().offset, 2);
    assert_eq!(qs.query().limit, Some(2));
    let titles: Vec<String> = qs.fetch_all().await.unwrap().into_iter().map(|b| b.title).collect();
    assert_eq!(titles, ["Carrie", "Dune"]);
}

#[tokio::test]
async fn test_get_errors() {
    let (_, objects) = seeded().await;
    let err = objects.get(Lookup::exact("title", "Ulysses")).await.unwrap_err();
    assert!(matches!(err, DjangoError::DoesNotExist(ref m) if m == "Book matching query does not exist."));

    let err = objects.get(Lookup::gt("pages", 900)).await.unwrap_err();
    assert!(matches!(
        err,
        DjangoError::MultipleObjectsReturned(ref m) if m == "get() returned more than one Book -- it returned 2!"
    ));

    let dune = objects.get(Lookup::iexact("title", "dune")).await.unwrap();
    assert_eq!(dune.pages, 412);
}

#[tokio::test]
async fn test_save_updates_and_delete_removes() {
    let (backend, objects) = seeded().await;
    let mut dune = objects.get(Lookup::exact("title", "Dune")).await.unwrap();
    dune.pages = 500;
    objects.save(dune.clone()).await.unwrap();
    assert_eq!(objects.get(Lookup::exact("id", dune.id)).await.unwrap().pages, 500);

    assert_eq!(objects.delete(&dune).await.unwrap(), 1);
    assert!(!objects.filter(Lookup::exact("title", "Dune")).exists().await.unwrap());
    assert_eq!(backend.snapshot().await.len(), 3);
}

#[tokio::test]
async fn test_backend_update_replaces_row_in_place() {
    use django_async_db::ModelBackend;

    let (backend, objects) = seeded().await;
    let mut carrie = objects.get(Lookup::exact("title", "Carrie")).await.unwrap();
    carrie.title = "Carrie (1974)".into();
    assert!(backend.update(&carrie).await.unwrap());
    let rows = backend.snapshot().await;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2].title, "Carrie (1974)");

    let missing = Book { id: Some(99), ..carrie };
    assert!(!backend.update(&missing).await.unwrap());
    assert_eq!(backend.snapshot().await.len(), 4);
}

#[tokio::test]
async fn test_delete_unsaved_instance_fails() {
    let (_, objects) = seeded().await;
    let err = objects.delete(&book("Nope", 1, 2000, 1, 1)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Book object can't be deleted because its id attribute is set to None."
    );
}

#[tokio::test]
async fn test_first_and_exclude_pk() {
    let (_, objects) = seeded().await;
    let first = objects.all().first().await.unwrap().unwrap();
    assert_eq!(first.title, "Anathem");
    let rest = objects.all().exclude_pk(first.id).count().await.unwrap();
    assert_eq!(rest, 3);
}

#[tokio::test]
async fn test_dates() {
    let (_, objects) = seeded().await;
    let years = objects
        .all()
        .dates("published", DatePeriod::Year, true)
        .await
        .unwrap();
    assert_eq!(years[0], NaiveDate::from_ymd_opt(2008, 1, 1).unwrap());
    assert_eq!(years.len(), 4);
}

#[tokio::test]
async fn test_queryset_as_object_list() {
    let (backend, objects) = seeded().await;
    let qs = objects.all();
    assert_eq!(ObjectList::count(&qs).await.unwrap(), 4);
    let window = qs.fetch_range(1, 3).await.unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].title, "Bleak House");
    assert_eq!(backend.query_count(), 2);
    assert_eq!(qs.model_meta().unwrap().model_name, "book");
    let by_pages = qs.with_ordering(&["pages".to_string()]);
    assert_eq!(by_pages.fetch_range(0, 1).await.unwrap()[0].title, "Carrie");
}

#[tokio::test]
async fn test_none_matches_nothing() {
    let (_, objects) = seeded().await;
    let empty = objects.all().none();
    assert_eq!(empty.count().await.unwrap(), 0);
    assert!(!empty.exists().await.unwrap());
    assert!(empty.fetch_all().await.unwrap().is_empty());
}

//! Bookshelf models: Author and Book.

use std::sync::LazyLock;

use chrono::NaiveDate;
use django_async::core::DjangoResult;
use django_async::db::{
    interpolate, FieldDef, FieldType, FromValue, Model, ModelMeta, OrderBy, Value,
};
use serde::Serialize;

pub const APP_LABEL: &str = "bookshelf";

/// A book author, addressed by slug.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
}

impl Author {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            slug: slugify(name),
        }
    }
}

impl Model for Author {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: APP_LABEL,
            model_name: "author",
            object_name: "Author",
            verbose_name: "author".to_string(),
            verbose_name_plural: "authors".to_string(),
            ordering: vec![OrderBy::asc("name")],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("name", FieldType::CharField).max_length(100),
                FieldDef::new("slug", FieldType::SlugField).max_length(100).unique(),
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
        Some(interpolate("/authors/{slug}/", &self.field_map()))
    }
}

/// A published book. Archives run over `pubdate`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub pages: i64,
    pub pubdate: NaiveDate,
    pub author_id: Option<i64>,
    pub summary: String,
}

impl Book {
    pub fn new(title: &str, pages: i64, pubdate: NaiveDate) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            pages,
            pubdate,
            author_id: None,
            summary: String::new(),
        }
    }

    #[must_use]
    pub const fn by(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

impl Model for Book {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: APP_LABEL,
            model_name: "book",
            object_name: "Book",
            verbose_name: "book".to_string(),
            verbose_name_plural: "books".to_string(),
            ordering: vec![OrderBy::desc("pubdate"), OrderBy::asc("title")],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("title", FieldType::CharField)
                    .max_length(200)
                    .help_text("As printed on the cover."),
                FieldDef::new("pages", FieldType::IntegerField),
                FieldDef::new("pubdate", FieldType::DateField).verbose_name("publication date"),
                FieldDef::new("author_id", FieldType::IntegerField)
                    .nullable()
                    .blank()
                    .verbose_name("author"),
                FieldDef::new("summary", FieldType::TextField).blank(),
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
            "pubdate" => Some(self.pubdate.into()),
            "author_id" => Some(self.author_id.into()),
            "summary" => Some(self.summary.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "title" => self.title = FromValue::from_value(&value)?,
            "pages" => self.pages = FromValue::from_value(&value)?,
            "pubdate" => self.pubdate = FromValue::from_value(&value)?,
            "author_id" => self.author_id = FromValue::from_value(&value)?,
            "summary" => self.summary = FromValue::from_value(&value)?,
            _ => {}
        }
        Ok(())
    }

    fn get_absolute_url(&self) -> Option<String> {
        self.id.map(|id| format!("/books/{id}/"))
    }
}

/// Lowercases `name` and joins its words with hyphens.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

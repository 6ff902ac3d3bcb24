//! Fixture models for view and form tests.
//!
//! Four small models in the `testapp` app, stored in an
//! [`InMemoryBackend`]:
//!
//! - [`Author`] - `name`, `slug`; links to `/authors/{id}/`
//! - [`Book`] - `name`, `pages`, `pubdate`, `author_id`; newest first
//! - [`Page`] - `content` and a per-object `template`
//! - [`Category`] - `name`, unique `slug`; links to `/categories/{slug}/`

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use django_async_core::DjangoResult;
use django_async_db::{
    interpolate, FieldDef, FieldType, FromValue, InMemoryBackend, Manager, Model, ModelMeta,
    OrderBy, Value,
};
use serde::Serialize;

pub const APP_LABEL: &str = "testapp";

macro_rules! fixture_model {
    (
        $(#[$attr:meta])*
        $name:ident {
            model_name: $model_name:literal,
            plural: $plural:literal,
            ordering: [$($ordering:expr),*],
            $(absolute_url: $url:literal,)?
            fields: { $($field:ident: $ty:ty = $def:expr),+ $(,)? } $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct $name {
            pub id: Option<i64>,
            $(pub $field: $ty,)+
        }

        impl Model for $name {
            fn meta() -> &'static ModelMeta {
                static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
                    app_label: APP_LABEL,
                    model_name: $model_name,
                    object_name: stringify!($name),
                    verbose_name: $model_name.into(),
                    verbose_name_plural: $plural.into(),
                    ordering: vec![$($ordering),*],
                    unique_together: vec![],
                    fields: vec![FieldDef::new("id", FieldType::AutoField), $($def),+],
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
                    $(stringify!($field) => Some(self.$field.clone().into()),)+
                    _ => None,
                }
            }

            fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
                match name {
                    "id" => self.id = FromValue::from_value(&value)?,
                    $(stringify!($field) => self.$field = FromValue::from_value(&value)?,)+
                    _ => {}
                }
                Ok(())
            }

            $(
                fn get_absolute_url(&self) -> Option<String> {
                    self.id.map(|_| interpolate($url, &self.field_map()))
                }
            )?
        }
    };
}

fixture_model! {
    /// A book author.
    Author {
        model_name: "author",
        plural: "authors",
        ordering: [OrderBy::asc("name")],
        absolute_url: "/authors/{id}/",
        fields: {
            name: String = FieldDef::new("name", FieldType::CharField).max_length(100),
            slug: String = FieldDef::new("slug", FieldType::SlugField),
        },
    }
}

fixture_model! {
    /// A dated book; the date archives run over `pubdate`.
    Book {
        model_name: "book",
        plural: "books",
        ordering: [OrderBy::desc("pubdate")],
        fields: {
            name: String = FieldDef::new("name", FieldType::CharField).max_length(255),
            pages: i64 = FieldDef::new("pages", FieldType::IntegerField),
            pubdate: NaiveDate = FieldDef::new("pubdate", FieldType::DateField),
            author_id: Option<i64> =
                FieldDef::new("author_id", FieldType::IntegerField).nullable().blank(),
        },
    }
}

fixture_model! {
    /// A page that names its own template.
    Page {
        model_name: "page",
        plural: "pages",
        ordering: [],
        fields: {
            content: String = FieldDef::new("content", FieldType::TextField),
            template: String = FieldDef::new("template", FieldType::CharField)
                .max_length(255)
                .blank(),
        },
    }
}

fixture_model! {
    /// A category addressed by slug.
    Category {
        model_name: "category",
        plural: "categories",
        ordering: [OrderBy::asc("name")],
        absolute_url: "/categories/{slug}/",
        fields: {
            name: String = FieldDef::new("name", FieldType::CharField).max_length(100),
            slug: String = FieldDef::new("slug", FieldType::SlugField).unique(),
        },
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

impl Author {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            slug: slugify(name),
        }
    }
}

impl Book {
    pub fn new(name: &str, pages: i64, pubdate: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            pages,
            pubdate,
            author_id: None,
        }
    }

    #[must_use]
    pub const fn by(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

impl Page {
    pub fn new(content: &str, template: &str) -> Self {
        Self {
            id: None,
            content: content.to_string(),
            template: template.to_string(),
        }
    }
}

impl Category {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            slug: slugify(name),
        }
    }
}

/// A fresh in-memory table and its manager.
pub fn in_memory<M: Model>() -> (Arc<InMemoryBackend<M>>, Manager<M>) {
    let backend = Arc::new(InMemoryBackend::new());
    let objects = Manager::new(backend.clone());
    (backend, objects)
}

/// Creates `instances` in order, returning them with their keys set.
pub async fn seed<M: Model>(objects: &Manager<M>, instances: Vec<M>) -> DjangoResult<Vec<M>> {
    let mut created = Vec::with_capacity(instances.len());
    for instance in instances {
        created.push(objects.create(instance).await?);
    }
    Ok(created)
}

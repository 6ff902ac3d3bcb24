//! The [`Model`] trait and model metadata.
//!
//! Views and forms never look inside a model struct directly. They read its
//! [`ModelMeta`] and move values in and out through
//! [`Model::field_value`] / [`Model::set_field_value`].

use std::collections::HashMap;

use django_async_core::DjangoResult;
use serde::Serialize;

use crate::fields::FieldDef;
use crate::query::OrderBy;
use crate::value::Value;

/// Model options, the equivalent of a Django `class Meta`.
#[derive(Debug)]
pub struct ModelMeta {
    /// The application label (e.g. "library").
    pub app_label: &'static str,
    /// The lowercase model name (e.g. "author").
    pub model_name: &'static str,
    /// The type name used in error messages (e.g. "Author").
    pub object_name: &'static str,
    pub verbose_name: String,
    pub verbose_name_plural: String,
    /// Default ordering applied when a query has none of its own.
    pub ordering: Vec<OrderBy>,
    pub fields: Vec<FieldDef>,
    /// Field sets whose combined values must be unique across rows.
    pub unique_together: Vec<Vec<&'static str>>,
}

impl ModelMeta {
    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Fields declared `unique`, primary key excluded.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.unique && !f.primary_key)
    }

    /// Returns `"<app_label>.<model_name>"`.
    pub fn label_lower(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }
}

/// A persistable record.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use django_async_core::DjangoResult;
/// use django_async_db::fields::{FieldDef, FieldType};
/// use django_async_db::model::{Model, ModelMeta};
/// use django_async_db::value::{FromValue, Value};
///
/// #[derive(Clone, serde::Serialize)]
/// struct Author {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Model for Author {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
///             app_label: "library",
///             model_name: "author",
///             object_name: "Author",
///             verbose_name: "author".to_string(),
///             verbose_name_plural: "authors".to_string(),
///             ordering: vec![],
///             unique_together: vec![],
///             fields: vec![
///                 FieldDef::new("id", FieldType::AutoField),
///                 FieldDef::new("name", FieldType::CharField).max_length(100),
///             ],
///         });
///         &META
///     }
///
///     fn pk(&self) -> Option<Value> {
///         self.id.map(Value::Int)
///     }
///
///     fn set_pk(&mut self, value: Value) {
///         self.id = value.as_int();
///     }
///
///     fn field_value(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(self.id.into()),
///             "name" => Some(self.name.clone().into()),
///             _ => None,
///         }
///     }
///
///     fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()> {
///         match name {
///             "id" => self.id = FromValue::from_value(&value)?,
///             "name" => self.name = FromValue::from_value(&value)?,
///             _ => {}
///         }
///         Ok(())
///     }
/// }
///
/// let author = Author { id: Some(1), name: "Ada".into() };
/// assert_eq!(author.field_map()["name"], "Ada");
/// assert_eq!(author.to_context()["id"], 1);
/// ```
pub trait Model: Clone + Send + Sync + Serialize + 'static {
    fn meta() -> &'static ModelMeta;

    /// Returns the primary key, or `None` for an unsaved instance.
    fn pk(&self) -> Option<Value>;

    fn set_pk(&mut self, value: Value);

    /// Returns the value of the named field.
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Assigns the named field. Unknown names are ignored.
    fn set_field_value(&mut self, name: &str, value: Value) -> DjangoResult<()>;

    fn get_absolute_url(&self) -> Option<String> {
        None
    }

    /// Returns the name of the primary key field.
    fn pk_field_name() -> &'static str {
        Self::meta().pk_field().map_or("id", |f| f.name)
    }

    /// Serializes the instance for a template context.
    fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Maps every declared field to its string form, for URL interpolation.
    fn field_map(&self) -> HashMap<String, String> {
        Self::meta()
            .fields
            .iter()
            .map(|f| {
                let value = self.field_value(f.name).unwrap_or(Value::Null);
                (f.name.to_string(), value.to_form_string())
            })
            .collect()
    }
}

/// Replaces `{name}` placeholders in `template` with values from `fields`.
///
/// Unknown placeholders are left as they are.
pub fn interpolate(template: &str, fields: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match fields.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    #[test]
    fn test_meta_lookups() {
        let meta = ModelMeta {
            app_label: "library",
            model_name: "book",
            object_name: "Book",
            verbose_name: "book".into(),
            verbose_name_plural: "books".into(),
            ordering: vec![],
            unique_together: vec![],
            fields: vec![
                FieldDef::new("id", FieldType::AutoField),
                FieldDef::new("title", FieldType::CharField),
            ],
        };
        assert_eq!(meta.pk_field().unwrap().name, "id");
        assert!(meta.get_field("title").is_some());
        assert!(meta.get_field("missing").is_none());
        assert_eq!(meta.label_lower(), "library.book");
    }

    #[test]
    fn test_interpolate() {
        let fields = HashMap::from([
            ("id".to_string(), "4".to_string()),
            ("slug".to_string(), "ada".to_string()),
        ]);
        assert_eq!(interpolate("/authors/{id}/", &fields), "/authors/4/");
        assert_eq!(interpolate("/a/{slug}/{id}", &fields), "/a/ada/4");
        assert_eq!(interpolate("/a/{nope}/", &fields), "/a/{nope}/");
        assert_eq!(interpolate("/a/{open", &fields), "/a/{open");
        assert_eq!(interpolate("/plain/", &fields), "/plain/");
    }
}

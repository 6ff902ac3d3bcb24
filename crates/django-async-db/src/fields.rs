//! Model field definitions.
//!
//! A [`FieldDef`] describes one model attribute: its [`FieldType`] and the
//! options model forms read when generating form fields (`blank`, `null`,
//! `default`, `editable`, `max_length`, `choices`).

use crate::value::Value;

/// The kind of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    AutoField,
    CharField,
    TextField,
    IntegerField,
    FloatField,
    BooleanField,
    DateField,
    DateTimeField,
    /// A `CharField` validated as an email address.
    EmailField,
    /// A `CharField` restricted to letters, digits, hyphens and underscores.
    SlugField,
    UrlField,
}

/// Definition of a single model field.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    pub primary_key: bool,
    /// Whether NULL may be stored.
    pub null: bool,
    /// Whether the field may be left blank in forms.
    pub blank: bool,
    pub default: Option<Value>,
    pub max_length: Option<usize>,
    pub verbose_name: String,
    pub help_text: String,
    /// Allowed values as (value, label) pairs.
    pub choices: Option<Vec<(String, String)>>,
    /// Non-editable fields never appear on model forms.
    pub editable: bool,
    /// No two rows may share a non-null value.
    pub unique: bool,
}

impl FieldDef {
    /// Creates a field with default options: required, editable, not a key.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            primary_key: matches!(field_type, FieldType::AutoField),
            null: false,
            blank: false,
            default: None,
            max_length: None,
            verbose_name: name.replace('_', " "),
            help_text: String::new(),
            choices: None,
            editable: true,
            unique: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    #[must_use]
    pub fn choices<V: Into<String>, L: Into<String>>(
        mut self,
        choices: impl IntoIterator<Item = (V, L)>,
    ) -> Self {
        self.choices = Some(
            choices
                .into_iter()
                .map(|(v, l)| (v.into(), l.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub const fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Returns `true` when a model form must receive a value for this field.
    pub const fn is_required(&self) -> bool {
        !self.null && !self.blank && self.default.is_none()
    }
}

//! The [`Form`] trait and the general-purpose [`BaseForm`].
//!
//! Validation is async: a form's `clean` hook may query the database (for
//! uniqueness checks and the like) before `is_valid` returns.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use django_async_db::Value;
use django_async_http::QueryDict;
use serde_json::json;

use crate::fields::FormFieldDef;
use crate::validation::{self, NON_FIELD_ERRORS};

/// Field name to error messages. Form-level errors live under `"__all__"`.
pub type FormErrors = HashMap<String, Vec<String>>;

/// A synchronous cross-field check attached with [`BaseForm::with_clean`].
pub type CleanFn = Arc<dyn Fn(&HashMap<String, Value>) -> Result<(), FormErrors> + Send + Sync>;

#[async_trait]
pub trait Form: Send + Sync {
    fn fields(&self) -> &[FormFieldDef];

    /// Initial values shown by an unbound form, keyed by field name.
    fn initial(&self) -> &HashMap<String, Value>;

    /// The prefix namespacing this form's inputs, if any.
    fn prefix(&self) -> Option<&str>;

    /// Binds submitted data. Any earlier validation result is discarded.
    fn bind(&mut self, data: &QueryDict);

    fn is_bound(&self) -> bool;

    /// Runs field cleaning then [`clean`](Self::clean). An unbound form is
    /// never valid.
    async fn is_valid(&mut self) -> bool;

    fn errors(&self) -> &FormErrors;

    /// Typed values of the fields that passed validation.
    fn cleaned_data(&self) -> &HashMap<String, Value>;

    /// Records an error against `field`, or against the whole form when
    /// `field` is `None`. The field is dropped from `cleaned_data`.
    fn add_error(&mut self, field: Option<&str>, message: String);

    fn non_field_errors(&self) -> &[String] {
        self.errors()
            .get(NON_FIELD_ERRORS)
            .map_or(&[], Vec::as_slice)
    }

    /// Cross-field validation hook, run after every field has been cleaned.
    async fn clean(&self) -> Result<(), FormErrors> {
        Ok(())
    }

    /// The form as template data: `fields`, `errors`, `non_field_errors`
    /// and `is_bound`.
    fn as_context(&self) -> serde_json::Value;
}

/// A form built from a list of field definitions.
#[derive(Clone)]
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    initial_data: HashMap<String, Value>,
    prefix: Option<String>,
    bound: bool,
    raw_data: HashMap<String, Option<String>>,
    errors: FormErrors,
    cleaned_data: HashMap<String, Value>,
    clean_fn: Option<CleanFn>,
}

impl fmt::Debug for BaseForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseForm")
            .field("fields", &self.field_defs.iter().map(|d| &d.name).collect::<Vec<_>>())
            .field("prefix", &self.prefix)
            .field("bound", &self.bound)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl BaseForm {
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            initial_data: HashMap::new(),
            prefix: None,
            bound: false,
            raw_data: HashMap::new(),
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
            clean_fn: None,
        }
    }

    #[must_use]
    pub fn with_initial(mut self, initial: HashMap<String, Value>) -> Self {
        self.initial_data = initial;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Attaches a cross-field check run by [`Form::clean`].
    #[must_use]
    pub fn with_clean<F>(mut self, validator: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> Result<(), FormErrors> + Send + Sync + 'static,
    {
        self.clean_fn = Some(Arc::new(validator));
        self
    }

    /// The raw submitted string for `name`, if bound and present.
    pub fn raw_value(&self, name: &str) -> Option<&str> {
        self.raw_data.get(name).and_then(|v| v.as_deref())
    }

    /// What an input should display: submitted data once bound, otherwise
    /// the form's initial value, then the field's.
    fn display_value(&self, field: &FormFieldDef) -> serde_json::Value {
        if self.bound {
            return self
                .raw_value(&field.name)
                .map_or(serde_json::Value::Null, |s| json!(s));
        }
        self.initial_data
            .get(&field.name)
            .or(field.initial.as_ref())
            .map_or(serde_json::Value::Null, Value::to_json)
    }
}

#[async_trait]
impl Form for BaseForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    fn initial(&self) -> &HashMap<String, Value> {
        &self.initial_data
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.field_defs {
            let value = data.get(&field.html_name(self.prefix.as_deref()));
            self.raw_data
                .insert(field.name.clone(), value.map(String::from));
        }
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }

        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &self.initial_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if let Err(form_errors) = self.clean().await {
            validation::merge_errors(form_errors, &mut self.cleaned_data, &mut self.errors);
        }

        if !self.errors.is_empty() {
            tracing::debug!(errors = ?self.errors, "Form did not validate");
        }
        self.errors.is_empty()
    }

    fn errors(&self) -> &FormErrors {
        &self.errors
    }

    fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }

    fn add_error(&mut self, field: Option<&str>, message: String) {
        let key = field.unwrap_or(NON_FIELD_ERRORS);
        self.cleaned_data.remove(key);
        self.errors.entry(key.to_string()).or_default().push(message);
    }

    async fn clean(&self) -> Result<(), FormErrors> {
        match &self.clean_fn {
            Some(validator) => validator(&self.cleaned_data),
            None => Ok(()),
        }
    }

    fn as_context(&self) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = self
            .field_defs
            .iter()
            .map(|field| {
                json!({
                    "name": field.name,
                    "html_name": field.html_name(self.prefix.as_deref()),
                    "label": field.label,
                    "help_text": field.help_text,
                    "input_type": field.field_type.input_type(),
                    "required": field.required,
                    "disabled": field.disabled,
                    "value": self.display_value(field),
                    "errors": self.errors.get(&field.name).cloned().unwrap_or_default(),
                })
            })
            .collect();

        json!({
            "fields": fields,
            "errors": self.errors,
            "non_field_errors": self.non_field_errors(),
            "is_bound": self.bound,
            "prefix": self.prefix,
        })
    }
}

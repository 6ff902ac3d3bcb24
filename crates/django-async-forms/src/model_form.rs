//! Forms generated from model metadata, saved through a [`Manager`].
//!
//! [`ModelFormConfig`] says which model fields become form fields;
//! [`fields_for_model`] does the conversion. [`ModelForm`] binds those
//! fields to an instance and persists it with an awaited
//! [`save`](ModelForm::save).

use std::collections::HashMap;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult, ValidationError};
use django_async_db::{FieldDef, FieldType, Lookup, Manager, Model, ModelMeta, Value};
use django_async_http::QueryDict;

use crate::fields::{FormFieldDef, FormFieldType};
use crate::form::{BaseForm, Form, FormErrors};
use crate::validation::NON_FIELD_ERRORS;

/// Which model fields a model form includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelFormFields {
    /// Every editable field (`fields = "__all__"`).
    All,
    /// Only these fields, in this order.
    Include(Vec<String>),
    /// Every editable field except these.
    Exclude(Vec<String>),
}

impl ModelFormFields {
    /// Builds an `Include` list from string slices.
    pub fn include<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Include(names.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

/// How to generate a form for one model.
#[derive(Debug, Clone)]
pub struct ModelFormConfig {
    pub model_meta: &'static ModelMeta,
    pub fields: ModelFormFields,
    /// Label overrides keyed by field name.
    pub labels: HashMap<String, String>,
    /// Help text overrides keyed by field name.
    pub help_texts: HashMap<String, String>,
}

impl ModelFormConfig {
    /// A config including every editable field.
    pub fn new(model_meta: &'static ModelMeta) -> Self {
        Self {
            model_meta,
            fields: ModelFormFields::All,
            labels: HashMap::new(),
            help_texts: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: ModelFormFields) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_label(mut self, field_name: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field_name.into(), label.into());
        self
    }

    #[must_use]
    pub fn with_help_text(mut self, field_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.help_texts.insert(field_name.into(), text.into());
        self
    }

    /// Generates the form fields with label and help text overrides applied.
    pub fn form_fields(&self) -> DjangoResult<Vec<FormFieldDef>> {
        let mut fields = fields_for_model(self.model_meta, &self.fields)?;
        for field in &mut fields {
            if let Some(label) = self.labels.get(&field.name) {
                field.label.clone_from(label);
            }
            if let Some(text) = self.help_texts.get(&field.name) {
                field.help_text.clone_from(text);
            }
        }
        Ok(fields)
    }
}

/// Generates form fields from model metadata.
///
/// Primary keys and non-editable fields are skipped. A field is required
/// unless it is nullable, may be blank, or has a default (which becomes its
/// initial value).
///
/// # Errors
///
/// `ImproperlyConfigured` when an `Include` list names a field the model
/// lacks or one that is not editable.
pub fn fields_for_model(
    meta: &ModelMeta,
    fields: &ModelFormFields,
) -> DjangoResult<Vec<FormFieldDef>> {
    let editable = |f: &&FieldDef| f.editable && !f.primary_key;

    let selected: Vec<&FieldDef> = match fields {
        ModelFormFields::All => meta.fields.iter().filter(editable).collect(),
        ModelFormFields::Exclude(exclude) => meta
            .fields
            .iter()
            .filter(editable)
            .filter(|f| !exclude.iter().any(|e| e == f.name))
            .collect(),
        ModelFormFields::Include(include) => {
            let unknown: Vec<&str> = include
                .iter()
                .filter(|name| meta.get_field(name).is_none())
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(DjangoError::ImproperlyConfigured(format!(
                    "Unknown field(s) ({}) specified for {}",
                    unknown.join(", "),
                    meta.object_name
                )));
            }
            let mut selected = Vec::with_capacity(include.len());
            for name in include {
                let Some(field) = meta.get_field(name) else {
                    continue;
                };
                if !field.editable {
                    return Err(DjangoError::ImproperlyConfigured(format!(
                        "'{name}' cannot be specified for {} model form as it is a non-editable field",
                        meta.object_name
                    )));
                }
                if !field.primary_key {
                    selected.push(field);
                }
            }
            selected
        }
    };

    Ok(selected.into_iter().map(form_field_for).collect())
}

fn form_field_for(model_field: &FieldDef) -> FormFieldDef {
    let mut field = FormFieldDef::new(model_field.name, form_field_type(model_field))
        .required(model_field.is_required())
        .label(model_field.verbose_name.clone())
        .help_text(model_field.help_text.clone());
    field.initial.clone_from(&model_field.default);
    field
}

fn form_field_type(model_field: &FieldDef) -> FormFieldType {
    if let Some(choices) = &model_field.choices {
        return FormFieldType::Choice {
            choices: choices.clone(),
        };
    }
    match model_field.field_type {
        FieldType::CharField | FieldType::TextField => FormFieldType::Char {
            min_length: None,
            max_length: model_field.max_length,
            strip: true,
        },
        FieldType::AutoField | FieldType::IntegerField => FormFieldType::integer(),
        FieldType::FloatField => FormFieldType::Float {
            min_value: None,
            max_value: None,
        },
        FieldType::BooleanField => FormFieldType::Boolean,
        FieldType::DateField => FormFieldType::Date,
        FieldType::DateTimeField => FormFieldType::DateTime,
        FieldType::EmailField => FormFieldType::Email,
        FieldType::SlugField => FormFieldType::Slug,
        FieldType::UrlField => FormFieldType::Url,
    }
}

const fn is_text(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::CharField
            | FieldType::TextField
            | FieldType::EmailField
            | FieldType::SlugField
            | FieldType::UrlField
    )
}

fn capfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "A", "A and B", "A, B and C".
fn text_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// "Product with this Slug already exists." for one field; sets of fields
/// are listed with "and".
fn unique_error(meta: &ModelMeta, fields: &[&str]) -> ValidationError {
    let labels: Vec<String> = fields
        .iter()
        .map(|name| {
            meta.get_field(name)
                .map_or_else(|| capfirst(name), |f| capfirst(&f.verbose_name))
        })
        .collect();
    let model_name = capfirst(&meta.verbose_name);
    let field_labels = text_list(&labels);
    let code = if fields.len() == 1 { "unique" } else { "unique_together" };
    ValidationError::new(
        format!("{model_name} with this {field_labels} already exists."),
        code,
    )
    .with_param("model_name", model_name)
    .with_param("field_labels", field_labels)
}

/// A form bound to one model instance.
///
/// A form without an instance works on `M::default()` and creates a row on
/// save; a form with one updates it.
#[derive(Debug)]
pub struct ModelForm<M: Model> {
    form: BaseForm,
    instance: M,
    objects: Manager<M>,
    validated: Option<bool>,
}

impl<M: Model + Default> ModelForm<M> {
    /// Builds the form. Initial values come from `instance` when given.
    pub fn new(
        config: &ModelFormConfig,
        objects: Manager<M>,
        instance: Option<M>,
    ) -> DjangoResult<Self> {
        let fields = config.form_fields()?;
        let object_data: HashMap<String, Value> = match &instance {
            Some(obj) => fields
                .iter()
                .filter_map(|f| obj.field_value(&f.name).map(|v| (f.name.clone(), v)))
                .collect(),
            None => HashMap::new(),
        };
        Ok(Self {
            form: BaseForm::new(fields).with_initial(object_data),
            instance: instance.unwrap_or_default(),
            objects,
            validated: None,
        })
    }
}

impl<M: Model> ModelForm<M> {
    /// Adds initial values on top of those taken from the instance.
    #[must_use]
    pub fn with_initial(mut self, initial: HashMap<String, Value>) -> Self {
        let mut merged = self.form.initial().clone();
        merged.extend(initial);
        self.form = self.form.with_initial(merged);
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.form = self.form.with_prefix(prefix);
        self
    }

    /// Attaches a cross-field check, as [`BaseForm::with_clean`].
    #[must_use]
    pub fn with_clean<F>(mut self, validator: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> Result<(), FormErrors> + Send + Sync + 'static,
    {
        self.form = self.form.with_clean(validator);
        self
    }

    /// The instance as it stands: unsaved changes are not applied until
    /// [`construct_instance`](Self::construct_instance) or `save`.
    pub const fn instance(&self) -> &M {
        &self.instance
    }

    /// Whether saving would insert rather than update.
    pub fn is_adding(&self) -> bool {
        self.instance.pk().map_or(true, |v| v.is_null())
    }

    /// Copies cleaned data onto a copy of the instance.
    ///
    /// Only this form's fields are touched. A field with a model default
    /// that was left out of the submitted data keeps the instance's value.
    pub fn construct_instance(&self) -> DjangoResult<M> {
        let meta = M::meta();
        let mut instance = self.instance.clone();
        for field in self.form.fields() {
            let Some(value) = self.form.cleaned_data().get(&field.name) else {
                continue;
            };
            let Some(model_field) = meta.get_field(&field.name) else {
                continue;
            };
            let omitted = self.form.raw_value(&field.name).is_none();
            if omitted
                && model_field.default.is_some()
                && model_field.field_type != FieldType::BooleanField
            {
                continue;
            }
            let value = if value.is_null() && !model_field.null && is_text(model_field.field_type) {
                Value::String(String::new())
            } else {
                value.clone()
            };
            instance.set_field_value(&field.name, value)?;
        }
        Ok(instance)
    }

    /// The field sets to check for uniqueness: each `unique` field, then
    /// each `unique_together` set. A set is skipped unless every field in
    /// it is on the form and cleaned without error.
    fn unique_checks(&self) -> Vec<Vec<&'static str>> {
        let meta = M::meta();
        let checkable = |name: &str| {
            self.form.fields().iter().any(|f| f.name == name)
                && !self.form.errors().contains_key(name)
        };
        meta.unique_fields()
            .map(|f| vec![f.name])
            .chain(meta.unique_together.iter().cloned())
            .filter(|set| !set.is_empty() && set.iter().all(|name| checkable(*name)))
            .collect()
    }

    /// Checks the cleaned values against other rows.
    ///
    /// Null values never clash. The instance's own row is excluded, so
    /// resubmitting an unchanged object passes.
    ///
    /// # Errors
    ///
    /// `ValidationError` keyed by field name, or by `__all__` for a
    /// `unique_together` set, when another row holds the same values.
    /// Backend errors pass through.
    pub async fn validate_unique(&self) -> DjangoResult<()> {
        let meta = M::meta();
        let instance = self.construct_instance()?;
        let own_pk = instance.pk().filter(|pk| !pk.is_null());
        let mut clashes: HashMap<String, Vec<ValidationError>> = HashMap::new();

        for set in self.unique_checks() {
            let values: Option<Vec<Value>> = set
                .iter()
                .map(|name| instance.field_value(name).filter(|v| !v.is_null()))
                .collect();
            let Some(values) = values else {
                continue;
            };
            let mut queryset = self.objects.all();
            for (name, value) in set.iter().zip(values) {
                queryset = queryset.filter(Lookup::exact(*name, value));
            }
            if let Some(pk) = &own_pk {
                queryset = queryset.exclude_pk(pk.clone());
            }
            if queryset.exists().await? {
                let key = match set.as_slice() {
                    [only] => (*only).to_string(),
                    _ => NON_FIELD_ERRORS.to_string(),
                };
                clashes.entry(key).or_default().push(unique_error(meta, &set));
            }
        }

        if clashes.is_empty() {
            Ok(())
        } else {
            Err(DjangoError::ValidationError(
                ValidationError::with_field_errors(clashes),
            ))
        }
    }

    /// Validates (if not yet done) and persists the instance.
    ///
    /// With `commit` false the constructed instance is returned unsaved.
    ///
    /// # Errors
    ///
    /// `ValueError` when the form does not validate.
    pub async fn save(&mut self, commit: bool) -> DjangoResult<M> {
        let valid = match self.validated {
            Some(valid) => valid,
            None => self.is_valid().await,
        };
        let meta = M::meta();
        if !valid {
            tracing::debug!(
                model = %meta.label_lower(),
                errors = %ValidationError::from_messages(self.form.errors()),
                "Model form did not validate"
            );
            let action = if self.is_adding() { "created" } else { "changed" };
            return Err(DjangoError::ValueError(format!(
                "The {} could not be {action} because the data didn't validate.",
                meta.object_name
            )));
        }

        let instance = self.construct_instance()?;
        if !commit {
            return Ok(instance);
        }
        let saved = self.objects.save(instance).await?;
        tracing::debug!(model = %meta.label_lower(), pk = ?saved.pk(), "Saved model form");
        self.instance = saved.clone();
        Ok(saved)
    }
}

#[async_trait]
impl<M: Model> Form for ModelForm<M> {
    fn fields(&self) -> &[FormFieldDef] {
        self.form.fields()
    }

    fn initial(&self) -> &HashMap<String, Value> {
        self.form.initial()
    }

    fn prefix(&self) -> Option<&str> {
        self.form.prefix()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.validated = None;
        self.form.bind(data);
    }

    fn is_bound(&self) -> bool {
        self.form.is_bound()
    }

    async fn is_valid(&mut self) -> bool {
        let mut valid = self.form.is_valid().await;
        if self.form.is_bound() {
            match self.validate_unique().await {
                Ok(()) => {}
                Err(DjangoError::ValidationError(err)) => {
                    for (field, errors) in &err.field_errors {
                        for message in errors.iter().flat_map(ValidationError::messages) {
                            self.form.add_error(Some(field.as_str()), message);
                        }
                    }
                    valid = false;
                }
                Err(err) => {
                    tracing::warn!(
                        model = %M::meta().label_lower(),
                        error = %err,
                        "Uniqueness check failed"
                    );
                    self.form.add_error(None, err.to_string());
                    valid = false;
                }
            }
        }
        self.validated = Some(valid);
        valid
    }

    fn errors(&self) -> &FormErrors {
        self.form.errors()
    }

    fn cleaned_data(&self) -> &HashMap<String, Value> {
        self.form.cleaned_data()
    }

    fn add_error(&mut self, field: Option<&str>, message: String) {
        self.validated = Some(false);
        self.form.add_error(field, message);
    }

    fn as_context(&self) -> serde_json::Value {
        let mut ctx = self.form.as_context();
        if let Some(map) = ctx.as_object_mut() {
            map.insert("instance".to_string(), self.instance.to_context());
        }
        ctx
    }
}

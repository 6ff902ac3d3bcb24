//! Form handling views: [`FormView`], [`CreateView`], [`UpdateView`] and
//! [`DeleteView`].
//!
//! A form is built per request from [`FormKwargs`] (initial values, prefix
//! and, for POST and PUT, the submitted data) and handed through
//! `form_valid` / `form_invalid` by value.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{interpolate, Model, Value};
use django_async_forms::{BaseForm, Form, FormFieldDef, ModelForm, ModelFormConfig, ModelFormFields};
use django_async_http::{HttpRequest, HttpResponse, HttpResponseRedirect, QueryDict};
use django_async_template::{Context, Engine};
use http::Method;

use crate::base::{ContextMixin, TemplateResponseMixin, View};
use crate::detail::{impl_object_view, ObjectOptions, SingleObjectMixin};

/// What a form is constructed with.
#[derive(Debug, Clone, Default)]
pub struct FormKwargs {
    pub initial: HashMap<String, Value>,
    pub prefix: Option<String>,
    /// Submitted data. Present for POST and PUT only.
    pub data: Option<QueryDict>,
}

/// Builds, validates and answers with a form.
#[async_trait]
pub trait FormMixin: ContextMixin + TemplateResponseMixin {
    type Form: Form;

    /// Initial form values. Returns a fresh map on every call.
    fn initial(&self) -> HashMap<String, Value> {
        HashMap::new()
    }

    fn prefix(&self) -> Option<&str> {
        None
    }

    fn success_url(&self) -> Option<&str> {
        None
    }

    fn get_form_kwargs(&self, request: &HttpRequest) -> FormKwargs {
        let data = matches!(*request.method(), Method::POST | Method::PUT)
            .then(|| request.post().clone());
        FormKwargs {
            initial: self.initial(),
            prefix: self.prefix().map(String::from),
            data,
        }
    }

    /// Constructs the form from `kwargs`, bound when `kwargs.data` is set.
    async fn build_form(&self, request: &HttpRequest, kwargs: FormKwargs) -> DjangoResult<Self::Form>;

    async fn get_form(&self, request: &HttpRequest) -> DjangoResult<Self::Form> {
        let kwargs = self.get_form_kwargs(request);
        self.build_form(request, kwargs).await
    }

    fn get_success_url(&self) -> DjangoResult<String> {
        self.success_url().map(String::from).ok_or_else(|| {
            DjangoError::ImproperlyConfigured(
                "No URL to redirect to. Provide a success_url.".to_string(),
            )
        })
    }

    /// Redirects to the success URL.
    async fn form_valid(&self, _request: &HttpRequest, _form: Self::Form) -> DjangoResult<HttpResponse> {
        Ok(HttpResponseRedirect::new(&self.get_success_url()?))
    }

    /// Re-renders the template with the bound form and its errors.
    async fn form_invalid(&self, request: &HttpRequest, form: Self::Form) -> DjangoResult<HttpResponse> {
        let context = self.get_form_context_data(request, &form, Context::new()).await?;
        self.render_to_response(self.get_template_names()?, context)
    }

    /// Inserts `form` into the context unless `extra` already has one.
    async fn get_form_context_data(
        &self,
        request: &HttpRequest,
        form: &Self::Form,
        extra: Context,
    ) -> DjangoResult<Context> {
        let mut context = extra;
        context
            .entry("form")
            .or_insert_with(|| form.as_context());
        self.get_context_data(request, context).await
    }

    /// Renders an unbound form.
    async fn process_get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let form = self.get_form(&request).await?;
        let context = self.get_form_context_data(&request, &form, Context::new()).await?;
        self.render_to_response(self.get_template_names()?, context)
    }

    /// Binds and validates the submitted form.
    async fn process_post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let mut form = self.get_form(&request).await?;
        if form.is_valid().await {
            self.form_valid(&request, form).await
        } else {
            self.form_invalid(&request, form).await
        }
    }
}

/// Model form handling on top of [`FormMixin`] and [`SingleObjectMixin`].
///
/// Implementors route `FormMixin::form_valid` and `form_invalid` to
/// [`model_form_valid`](Self::model_form_valid) and
/// [`model_form_invalid`](Self::model_form_invalid).
#[async_trait]
pub trait ModelFormMixin:
    SingleObjectMixin<Object: Default> + FormMixin<Form = ModelForm<<Self as SingleObjectMixin>::Object>>
{
    /// Model fields to put on the form.
    fn fields(&self) -> Option<&ModelFormFields> {
        None
    }

    /// A complete form configuration, as an alternative to
    /// [`fields`](Self::fields).
    fn form_class(&self) -> Option<&ModelFormConfig> {
        None
    }

    fn get_form_config(&self) -> DjangoResult<ModelFormConfig> {
        match (self.fields(), self.form_class()) {
            (Some(_), Some(_)) => Err(DjangoError::ImproperlyConfigured(
                "Specifying both 'fields' and 'form_class' is not permitted.".to_string(),
            )),
            (None, Some(config)) => Ok(config.clone()),
            (Some(fields), None) => Ok(ModelFormConfig::new(
                <Self as SingleObjectMixin>::Object::meta(),
            )
            .with_fields(fields.clone())),
            (None, None) => Err(DjangoError::ImproperlyConfigured(format!(
                "Using ModelFormMixin (base class of {}) without the 'fields' attribute is \
                 prohibited.",
                self.view_name()
            ))),
        }
    }

    /// Builds the model form for `instance` (`None` to create).
    async fn build_model_form(
        &self,
        request: &HttpRequest,
        kwargs: FormKwargs,
        instance: Option<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<ModelForm<<Self as SingleObjectMixin>::Object>> {
        let config = self.get_form_config()?;
        let objects = self.get_queryset(request).await?.manager();
        let mut form = ModelForm::new(&config, objects, instance)?.with_initial(kwargs.initial);
        if let Some(prefix) = kwargs.prefix {
            form = form.with_prefix(prefix);
        }
        if let Some(data) = kwargs.data {
            form.bind(&data);
        }
        Ok(form)
    }

    async fn get_model_form(
        &self,
        request: &HttpRequest,
        instance: Option<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<ModelForm<<Self as SingleObjectMixin>::Object>> {
        let kwargs = self.get_form_kwargs(request);
        self.build_model_form(request, kwargs, instance).await
    }

    /// `success_url` with `{field}` placeholders filled from `object`, or
    /// the object's absolute URL.
    fn model_success_url(&self, object: &<Self as SingleObjectMixin>::Object) -> DjangoResult<String> {
        if let Some(url) = self.success_url() {
            return Ok(interpolate(url, &object.field_map()));
        }
        object.get_absolute_url().ok_or_else(|| {
            DjangoError::ImproperlyConfigured(
                "No URL to redirect to. Either provide a url or define a get_absolute_url method \
                 on the Model."
                    .to_string(),
            )
        })
    }

    /// Saves the form and redirects.
    async fn model_form_valid(
        &self,
        _request: &HttpRequest,
        mut form: ModelForm<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<HttpResponse> {
        let object = form.save(true).await?;
        Ok(HttpResponseRedirect::new(&self.model_success_url(&object)?))
    }

    /// Re-renders with the form, and the object when editing one.
    async fn model_form_invalid(
        &self,
        request: &HttpRequest,
        form: ModelForm<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<HttpResponse> {
        let object = (!form.is_adding()).then(|| form.instance().clone());
        self.render_model_form(request, &form, object.as_ref()).await
    }

    async fn render_model_form(
        &self,
        request: &HttpRequest,
        form: &ModelForm<<Self as SingleObjectMixin>::Object>,
        object: Option<&<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<HttpResponse> {
        let mut extra = Context::new();
        extra.insert("form".into(), form.as_context());
        let template_names = self.get_object_template_names(object)?;
        let context = self.get_object_context_data(request, object, extra).await?;
        self.render_to_response(template_names, context)
    }

    async fn model_process_get(
        &self,
        request: HttpRequest,
        instance: Option<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<HttpResponse> {
        let form = self.get_model_form(&request, instance.clone()).await?;
        self.render_model_form(&request, &form, instance.as_ref()).await
    }

    async fn model_process_post(
        &self,
        request: HttpRequest,
        instance: Option<<Self as SingleObjectMixin>::Object>,
    ) -> DjangoResult<HttpResponse> {
        let mut form = self.get_model_form(&request, instance).await?;
        if form.is_valid().await {
            self.form_valid(&request, form).await
        } else {
            self.form_invalid(&request, form).await
        }
    }
}

/// Builds the form for a [`FormView`].
pub type FormFactory<F> = Arc<dyn Fn(FormKwargs) -> F + Send + Sync>;

/// Displays a form, re-displays it with errors, and redirects on success.
pub struct FormView<F: Form> {
    name: String,
    factory: FormFactory<F>,
    template_name: Option<String>,
    engine: Option<Arc<Engine>>,
    extra_context: Option<Context>,
    content_type: Option<String>,
    initial: HashMap<String, Value>,
    prefix: Option<String>,
    success_url: Option<String>,
}

impl<F: Form + 'static> FormView<F> {
    /// A view whose form comes from `factory`. The factory receives the
    /// initial values, prefix and submitted data for the request.
    pub fn new<B>(name: &str, factory: B) -> Self
    where
        B: Fn(FormKwargs) -> F + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            factory: Arc::new(factory),
            template_name: None,
            engine: None,
            extra_context: None,
            content_type: None,
            initial: HashMap::new(),
            prefix: None,
            success_url: None,
        }
    }

    #[must_use]
    pub fn template_name(mut self, name: &str) -> Self {
        self.template_name = Some(name.to_string());
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
    pub fn initial(mut self, initial: HashMap<String, Value>) -> Self {
        self.initial = initial;
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    #[must_use]
    pub fn success_url(mut self, url: &str) -> Self {
        self.success_url = Some(url.to_string());
        self
    }
}

impl FormView<BaseForm> {
    /// A view over a [`BaseForm`] with the given fields.
    pub fn from_fields(name: &str, fields: Vec<FormFieldDef>) -> Self {
        Self::new(name, move |kwargs| base_form(fields.clone(), kwargs))
    }
}

/// Builds a [`BaseForm`] from `kwargs`, bound when data was submitted.
pub fn base_form(fields: Vec<FormFieldDef>, kwargs: FormKwargs) -> BaseForm {
    let mut form = BaseForm::new(fields).with_initial(kwargs.initial);
    if let Some(prefix) = kwargs.prefix {
        form = form.with_prefix(prefix);
    }
    if let Some(data) = kwargs.data {
        form.bind(&data);
    }
    form
}

#[async_trait]
impl<F: Form + 'static> View for FormView<F> {
    fn view_name(&self) -> &str {
        &self.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST, Method::PUT]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.process_get(request).await
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.process_post(request).await
    }

    async fn put(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.process_post(request).await
    }
}

impl<F: Form + 'static> ContextMixin for FormView<F> {
    fn extra_context(&self) -> Option<&Context> {
        self.extra_context.as_ref()
    }
}

impl<F: Form + 'static> TemplateResponseMixin for FormView<F> {
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

#[async_trait]
impl<F: Form + 'static> FormMixin for FormView<F> {
    type Form = F;

    fn initial(&self) -> HashMap<String, Value> {
        self.initial.clone()
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }

    async fn build_form(&self, _request: &HttpRequest, kwargs: FormKwargs) -> DjangoResult<F> {
        Ok((self.factory)(kwargs))
    }
}

/// Form options shared by the model form views.
struct ModelFormOptions {
    fields: Option<ModelFormFields>,
    form_class: Option<ModelFormConfig>,
    initial: HashMap<String, Value>,
    prefix: Option<String>,
    success_url: Option<String>,
}

impl ModelFormOptions {
    fn new() -> Self {
        Self {
            fields: None,
            form_class: None,
            initial: HashMap::new(),
            prefix: None,
            success_url: None,
        }
    }
}

/// Implements the form builders, `FormMixin` and `ModelFormMixin` for a
/// model form view with `opts` and `form_opts` fields. `$instance` names
/// the method giving the instance a standalone `get_form` edits.
macro_rules! impl_model_form_view {
    ($view:ident, $instance:ident) => {
        impl<M: Model + Default> $view<M> {
            /// Puts these model fields on the form.
            #[must_use]
            pub fn fields<S: AsRef<str>>(mut self, names: &[S]) -> Self {
                self.form_opts.fields = Some(ModelFormFields::include(names));
                self
            }

            /// Puts every editable model field on the form.
            #[must_use]
            pub fn all_fields(mut self) -> Self {
                self.form_opts.fields = Some(ModelFormFields::All);
                self
            }

            #[must_use]
            pub fn form_class(mut self, config: ModelFormConfig) -> Self {
                self.form_opts.form_class = Some(config);
                self
            }

            #[must_use]
            pub fn initial(mut self, initial: HashMap<String, Value>) -> Self {
                self.form_opts.initial = initial;
                self
            }

            #[must_use]
            pub fn prefix(mut self, prefix: &str) -> Self {
                self.form_opts.prefix = Some(prefix.to_string());
                self
            }

            /// Where to go after saving. `{field}` placeholders are filled
            /// from the saved object.
            #[must_use]
            pub fn success_url(mut self, url: &str) -> Self {
                self.form_opts.success_url = Some(url.to_string());
                self
            }
        }

        #[async_trait]
        impl<M: Model + Default> FormMixin for $view<M> {
            type Form = ModelForm<M>;

            fn initial(&self) -> HashMap<String, Value> {
                self.form_opts.initial.clone()
            }

            fn prefix(&self) -> Option<&str> {
                self.form_opts.prefix.as_deref()
            }

            fn success_url(&self) -> Option<&str> {
                self.form_opts.success_url.as_deref()
            }

            async fn build_form(
                &self,
                request: &HttpRequest,
                kwargs: FormKwargs,
            ) -> DjangoResult<ModelForm<M>> {
                let instance = self.$instance(request).await?;
                self.build_model_form(request, kwargs, instance).await
            }

            async fn form_valid(
                &self,
                request: &HttpRequest,
                form: ModelForm<M>,
            ) -> DjangoResult<HttpResponse> {
                self.model_form_valid(request, form).await
            }

            async fn form_invalid(
                &self,
                request: &HttpRequest,
                form: ModelForm<M>,
            ) -> DjangoResult<HttpResponse> {
                self.model_form_invalid(request, form).await
            }
        }

        impl<M: Model + Default> ModelFormMixin for $view<M> {
            fn fields(&self) -> Option<&ModelFormFields> {
                self.form_opts.fields.as_ref()
            }

            fn form_class(&self) -> Option<&ModelFormConfig> {
                self.form_opts.form_class.as_ref()
            }
        }
    };
}

/// Creates an object from a model form.
pub struct CreateView<M: Model> {
    opts: ObjectOptions<M>,
    form_opts: ModelFormOptions,
}

impl<M: Model + Default> CreateView<M> {
    pub fn new(name: &str) -> Self {
        Self {
            opts: ObjectOptions::new(name, "_form"),
            form_opts: ModelFormOptions::new(),
        }
    }

    async fn no_instance(&self, _request: &HttpRequest) -> DjangoResult<Option<M>> {
        Ok(None)
    }
}

impl_object_view!(CreateView, Default);
impl_model_form_view!(CreateView, no_instance);

#[async_trait]
impl<M: Model + Default> View for CreateView<M> {
    fn view_name(&self) -> &str {
        &self.opts.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST, Method::PUT]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.model_process_get(request, None).await
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.model_process_post(request, None).await
    }

    async fn put(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.model_process_post(request, None).await
    }
}

/// Edits an existing object through a model form.
pub struct UpdateView<M: Model> {
    opts: ObjectOptions<M>,
    form_opts: ModelFormOptions,
}

impl<M: Model + Default> UpdateView<M> {
    pub fn new(name: &str) -> Self {
        Self {
            opts: ObjectOptions::new(name, "_form"),
            form_opts: ModelFormOptions::new(),
        }
    }

    async fn current_instance(&self, request: &HttpRequest) -> DjangoResult<Option<M>> {
        self.get_object(request).await.map(Some)
    }
}

impl_object_view!(UpdateView, Default);
impl_model_form_view!(UpdateView, current_instance);

#[async_trait]
impl<M: Model + Default> View for UpdateView<M> {
    fn view_name(&self) -> &str {
        &self.opts.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST, Method::PUT]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        self.model_process_get(request, Some(object)).await
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        self.model_process_post(request, Some(object)).await
    }

    async fn put(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.post(request).await
    }
}

/// Deletes an object and redirects.
#[async_trait]
pub trait DeletionMixin: SingleObjectMixin {
    fn delete_success_url(&self) -> Option<&str> {
        None
    }

    /// The success URL with `{field}` placeholders filled from `object`.
    fn get_delete_success_url(&self, object: &Self::Object) -> DjangoResult<String> {
        self.delete_success_url()
            .map(|url| interpolate(url, &object.field_map()))
            .ok_or_else(|| {
                DjangoError::ImproperlyConfigured(
                    "No URL to redirect to. Provide a success_url.".to_string(),
                )
            })
    }

    /// Resolves the success URL, deletes `object`, then redirects.
    async fn delete_object(
        &self,
        request: &HttpRequest,
        object: Self::Object,
    ) -> DjangoResult<HttpResponse> {
        let success_url = self.get_delete_success_url(&object)?;
        let manager = self.get_queryset(request).await?.manager();
        manager.delete(&object).await?;
        tracing::debug!(
            model = %Self::Object::meta().label_lower(),
            pk = ?object.pk(),
            "Deleted object"
        );
        Ok(HttpResponseRedirect::new(&success_url))
    }
}

/// Shows a confirmation page on GET and deletes on POST or DELETE.
///
/// POST validates an optional confirmation form first; an invalid form
/// re-renders the page and deletes nothing.
pub struct DeleteView<M: Model> {
    opts: ObjectOptions<M>,
    confirm_fields: Vec<FormFieldDef>,
    success_url: Option<String>,
}

impl<M: Model> DeleteView<M> {
    pub fn new(name: &str) -> Self {
        Self {
            opts: ObjectOptions::new(name, "_confirm_delete"),
            confirm_fields: Vec::new(),
            success_url: None,
        }
    }

    /// Where to go after deleting. `{field}` placeholders are filled from
    /// the deleted object.
    #[must_use]
    pub fn success_url(mut self, url: &str) -> Self {
        self.success_url = Some(url.to_string());
        self
    }

    /// Fields the confirmation form must validate before deleting.
    #[must_use]
    pub fn confirm_fields(mut self, fields: Vec<FormFieldDef>) -> Self {
        self.confirm_fields = fields;
        self
    }

    async fn render_confirmation(
        &self,
        request: &HttpRequest,
        object: &M,
        form: &BaseForm,
    ) -> DjangoResult<HttpResponse> {
        let mut extra = Context::new();
        extra.insert("form".into(), form.as_context());
        let template_names = self.get_object_template_names(Some(object))?;
        let context = self
            .get_object_context_data(request, Some(object), extra)
            .await?;
        self.render_to_response(template_names, context)
    }
}

impl_object_view!(DeleteView);

impl<M: Model> DeletionMixin for DeleteView<M> {
    fn delete_success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }
}

#[async_trait]
impl<M: Model> FormMixin for DeleteView<M> {
    type Form = BaseForm;

    fn success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }

    async fn build_form(&self, _request: &HttpRequest, kwargs: FormKwargs) -> DjangoResult<BaseForm> {
        Ok(base_form(self.confirm_fields.clone(), kwargs))
    }
}

#[async_trait]
impl<M: Model> View for DeleteView<M> {
    fn view_name(&self) -> &str {
        &self.opts.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST, Method::DELETE]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        let form = self.get_form(&request).await?;
        self.render_confirmation(&request, &object, &form).await
    }

    async fn post(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        let mut form = self.get_form(&request).await?;
        if form.is_valid().await {
            self.delete_object(&request, object).await
        } else {
            self.render_confirmation(&request, &object, &form).await
        }
    }

    async fn delete(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_object(&request).await?;
        self.delete_object(&request, object).await
    }
}

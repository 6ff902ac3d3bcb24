//! Template engine: loading, selecting and rendering templates.

use std::error::Error as _;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use django_async_core::settings::TemplateSettings;
use django_async_core::{DjangoError, DjangoResult};
use tera::Tera;

/// The data a template is rendered with.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Wraps a [`Tera`] instance behind a lock so templates can be added after
/// the engine is shared.
#[derive(Debug, Default)]
pub struct Engine {
    tera: RwLock<Tera>,
    dirs: RwLock<Vec<PathBuf>>,
}

fn convert(err: &tera::Error, name: &str) -> DjangoError {
    if let tera::ErrorKind::TemplateNotFound(missing) = &err.kind {
        return DjangoError::TemplateDoesNotExist(missing.clone());
    }
    let mut message = format!("{name}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    DjangoError::TemplateSyntaxError(message)
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine and loads every `*.html` file under the configured
    /// directories. The `autoescape` option (default `true`) controls HTML
    /// escaping.
    pub fn from_settings(settings: &TemplateSettings) -> DjangoResult<Self> {
        let engine = Self::new();
        if settings
            .options
            .get("autoescape")
            .and_then(serde_json::Value::as_bool)
            == Some(false)
        {
            engine.write().autoescape_on(vec![]);
        }
        engine.set_dirs(settings.dirs.clone())?;
        Ok(engine)
    }

    fn read(&self) -> RwLockReadGuard<'_, Tera> {
        self.tera.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tera> {
        self.tera.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads `**/*.html` from each directory. Names are relative to the
    /// directory, so `templates/library/book_list.html` is
    /// `library/book_list.html`.
    pub fn set_dirs(&self, dirs: Vec<PathBuf>) -> DjangoResult<()> {
        for dir in &dirs {
            let pattern = format!("{}/**/*.html", dir.display());
            let loaded = Tera::new(&pattern).map_err(|e| convert(&e, &pattern))?;
            self.write()
                .extend(&loaded)
                .map_err(|e| convert(&e, &pattern))?;
            tracing::debug!(dir = %dir.display(), "Loaded template directory");
        }
        *self.dirs.write().unwrap_or_else(PoisonError::into_inner) = dirs;
        Ok(())
    }

    /// Returns the configured template directories.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registers an in-memory template, replacing any with the same name.
    pub fn add_string_template(&self, name: &str, source: &str) -> DjangoResult<()> {
        self.write()
            .add_raw_template(name, source)
            .map_err(|e| convert(&e, name))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.read().get_template_names().any(|n| n == name)
    }

    /// Returns the first name in `names` that exists.
    ///
    /// # Errors
    ///
    /// `TemplateDoesNotExist` listing every candidate when none exists.
    pub fn select_template(&self, names: &[String]) -> DjangoResult<String> {
        let tera = self.read();
        let found = names
            .iter()
            .find(|name| tera.get_template_names().any(|n| n == name.as_str()));
        match found {
            Some(name) => {
                tracing::debug!(template = %name, candidates = ?names, "Selected template");
                Ok(name.clone())
            }
            None => Err(DjangoError::TemplateDoesNotExist(names.join(", "))),
        }
    }

    /// Renders the named template with `context`.
    pub fn render_to_string(&self, name: &str, context: &Context) -> DjangoResult<String> {
        let ctx = tera::Context::from_serialize(context).map_err(|e| convert(&e, name))?;
        self.read().render(name, &ctx).map_err(|e| convert(&e, name))
    }
}

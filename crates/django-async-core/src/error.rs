//! Core error types for django-async.
//!
//! [`DjangoError`] is the single error taxonomy forwarded through every
//! awaited view, form and query path. Each variant maps to an HTTP status
//! through [`DjangoError::status_code`], which is how a failed view turns
//! into a response.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A validation error with optional per-field errors.
///
/// # Examples
///
/// ```
/// use django_async_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
/// ```
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code for the failure (e.g. "required", "invalid").
    pub code: String,
    /// Parameters referenced by the message.
    pub params: HashMap<String, String>,
    /// Per-field errors, keyed by field name. Form-wide errors use `__all__`.
    pub field_errors: HashMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
            field_errors: HashMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: HashMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            params: HashMap::new(),
            field_errors,
        }
    }

    /// Builds a compound error from plain message lists, as forms store them.
    pub fn from_messages(errors: &HashMap<String, Vec<String>>) -> Self {
        let field_errors = errors
            .iter()
            .map(|(field, messages)| {
                let list = messages
                    .iter()
                    .map(|m| Self::new(m.clone(), "invalid"))
                    .collect();
                (field.clone(), list)
            })
            .collect();
        Self::with_field_errors(field_errors)
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns every message in this error, field errors included.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.message.is_empty() {
            out.push(self.message.clone());
        }
        let mut fields: Vec<&String> = self.field_errors.keys().collect();
        fields.sort();
        for field in fields {
            for error in &self.field_errors[field] {
                out.extend(error.messages());
            }
        }
        out
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            return write!(f, "{}", self.message);
        }
        let mut fields: Vec<&String> = self.field_errors.keys().collect();
        fields.sort();
        let mut first = true;
        for field in fields {
            for error in &self.field_errors[field] {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The error type shared by views, forms, queries and settings.
///
/// Each variant maps to an HTTP status code via [`DjangoError::status_code`].
#[derive(Error, Debug)]
pub enum DjangoError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 403, raised by failed access checks.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404, raised for missing pages and objects.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 410 Gone.
    #[error("Gone")]
    Gone,

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── ORM errors ───────────────────────────────────────────────────

    /// A lookup expected exactly one object and found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A lookup expected exactly one object and found several.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A backend failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    /// An operation was attempted on data in the wrong state, such as
    /// saving a model form that did not validate.
    #[error("{0}")]
    ValueError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings file could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A view, form or model is missing a required attribute.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Templates ────────────────────────────────────────────────────

    /// A template failed to parse or render.
    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(String),

    /// None of the requested templates exist.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Serialization ────────────────────────────────────────────────

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DjangoError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationError` -> 400
    /// - `PermissionDenied` -> 403
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - `Gone` -> 410
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::Gone => 410,
            Self::InternalServerError(_)
            | Self::MultipleObjectsReturned(_)
            | Self::DatabaseError(_)
            | Self::ValueError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::TemplateSyntaxError(_)
            | Self::TemplateDoesNotExist(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns the bare message carried by this error, without the
    /// category prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(m)
            | Self::PermissionDenied(m)
            | Self::NotFound(m)
            | Self::InternalServerError(m)
            | Self::DoesNotExist(m)
            | Self::MultipleObjectsReturned(m)
            | Self::DatabaseError(m)
            | Self::ValueError(m)
            | Self::ConfigurationError(m)
            | Self::ImproperlyConfigured(m)
            | Self::TemplateSyntaxError(m)
            | Self::TemplateDoesNotExist(m)
            | Self::SerializationError(m) => m.clone(),
            Self::ValidationError(e) => e.to_string(),
            Self::Gone => String::new(),
            Self::IoError(e) => e.to_string(),
        }
    }
}

impl From<serde_json::Error> for DjangoError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, DjangoError>`.
pub type DjangoResult<T> = Result<T, DjangoError>;

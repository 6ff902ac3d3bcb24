//! Form field definitions and type-level cleaning.
//!
//! A [`FormFieldDef`] describes one input: its [`FormFieldType`], whether
//! it is required, its label and initial value. [`clean_field_value`] turns
//! the raw submitted string into a typed [`Value`] or a list of messages.

use std::collections::HashMap;
use std::sync::LazyLock;

use django_async_db::Value;
use regex::Regex;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").ok());
static URL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").ok());
static SLUG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").ok());

fn matches(re: &LazyLock<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

/// The kind of a form field and its type-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldType {
    Char {
        min_length: Option<usize>,
        max_length: Option<usize>,
        /// Trim surrounding whitespace before validating.
        strip: bool,
    },
    Integer {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    Float {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Boolean,
    /// `YYYY-MM-DD`.
    Date,
    DateTime,
    Email,
    Slug,
    Url,
    /// One of a fixed set of `(value, label)` pairs.
    Choice { choices: Vec<(String, String)> },
}

impl FormFieldType {
    /// A plain text field with no length limits.
    pub const fn char() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: true,
        }
    }

    pub const fn integer() -> Self {
        Self::Integer {
            min_value: None,
            max_value: None,
        }
    }

    /// The HTML input type a template should render.
    pub const fn input_type(&self) -> &'static str {
        match self {
            Self::Char { .. } | Self::Slug => "text",
            Self::Integer { .. } | Self::Float { .. } => "number",
            Self::Boolean => "checkbox",
            Self::Date => "date",
            Self::DateTime => "datetime-local",
            Self::Email => "email",
            Self::Url => "url",
            Self::Choice { .. } => "select",
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    pub name: String,
    pub field_type: FormFieldType,
    pub required: bool,
    pub initial: Option<Value>,
    pub label: String,
    pub help_text: String,
    /// Overrides for built-in messages, keyed by code (`"required"`).
    pub error_messages: HashMap<String, String>,
    /// Disabled fields keep their initial value whatever is submitted.
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a required field labelled after its name.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            label,
            help_text: String::new(),
            error_messages: HashMap::new(),
            disabled: false,
        }
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    #[must_use]
    pub fn error_message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), msg.into());
        self
    }

    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// The `name` attribute used in submitted data.
    pub fn html_name(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(p) => format!("{p}-{}", self.name),
            None => self.name.clone(),
        }
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    n: &T,
    min: Option<&T>,
    max: Option<&T>,
    errors: &mut Vec<String>,
) {
    if let Some(min) = min {
        if n < min {
            errors.push(format!("Ensure this value is greater than or equal to {min}."));
        }
    }
    if let Some(max) = max {
        if n > max {
            errors.push(format!("Ensure this value is less than or equal to {max}."));
        }
    }
}

/// Cleans a raw submitted string into a typed [`Value`].
///
/// An empty optional field cleans to its initial value, or `Null`.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    let raw_str = raw.unwrap_or("");
    let stripped = match field.field_type {
        FormFieldType::Char { strip: false, .. } => raw_str,
        _ => raw_str.trim(),
    };

    if stripped.is_empty() {
        if field.required {
            let msg = field
                .error_messages
                .get("required")
                .cloned()
                .unwrap_or_else(|| "This field is required.".to_string());
            return Err(vec![msg]);
        }
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    let mut errors = Vec::new();

    let value = match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            ..
        } => {
            let len = stripped.chars().count();
            if let Some(min) = min_length {
                if len < *min {
                    errors.push(format!(
                        "Ensure this value has at least {min} characters (it has {len})."
                    ));
                }
            }
            if let Some(max) = max_length {
                if len > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    ));
                }
            }
            Value::String(stripped.to_string())
        }

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match stripped.parse::<i64>() {
            Ok(n) => {
                check_range(&n, min_value.as_ref(), max_value.as_ref(), &mut errors);
                Value::Int(n)
            }
            Err(_) => {
                errors.push("Enter a whole number.".to_string());
                Value::Null
            }
        },

        FormFieldType::Float {
            min_value,
            max_value,
        } => match stripped.parse::<f64>() {
            Ok(n) if n.is_finite() => {
                check_range(&n, min_value.as_ref(), max_value.as_ref(), &mut errors);
                Value::Float(n)
            }
            _ => {
                errors.push("Enter a number.".to_string());
                Value::Null
            }
        },

        FormFieldType::Boolean => Value::Bool(matches!(
            stripped.to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )),

        FormFieldType::Date => match chrono::NaiveDate::parse_from_str(stripped, "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => {
                errors.push("Enter a valid date (YYYY-MM-DD).".to_string());
                Value::Null
            }
        },

        FormFieldType::DateTime => {
            let parsed = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(stripped, fmt).ok());
            if let Some(dt) = parsed {
                Value::DateTime(dt)
            } else {
                errors.push("Enter a valid date/time.".to_string());
                Value::Null
            }
        }

        FormFieldType::Email => {
            if !matches(&EMAIL_RE, stripped) {
                errors.push("Enter a valid email address.".to_string());
            }
            Value::String(stripped.to_string())
        }

        FormFieldType::Url => {
            if !matches(&URL_RE, stripped) {
                errors.push("Enter a valid URL.".to_string());
            }
            Value::String(stripped.to_string())
        }

        FormFieldType::Slug => {
            if !matches(&SLUG_RE, stripped) {
                errors.push(
                    "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens."
                        .to_string(),
                );
            }
            Value::String(stripped.to_string())
        }

        FormFieldType::Choice { choices } => {
            if !choices.iter().any(|(v, _)| v == stripped) {
                errors.push(format!(
                    "Select a valid choice. {stripped} is not one of the available choices."
                ));
            }
            Value::String(stripped.to_string())
        }
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

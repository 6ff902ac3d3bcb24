//! Settings loading from configuration files and the environment.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML file (missing keys keep their defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! | Env Var | Setting |
//! |---|---|
//! | `DJANGO_DEBUG` | `debug` |
//! | `DJANGO_LOG_LEVEL` | `log_level` |
//! | `DJANGO_SECRET_KEY` | `secret_key` |
//! | `DJANGO_LOGIN_URL` | `login_url` |
//! | `DJANGO_TEMPLATE_DIRS` | `templates.dirs` (comma-separated) |

use std::path::{Path, PathBuf};

use crate::error::DjangoError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, DjangoError> {
    toml::from_str(toml_str)
        .map_err(|e| DjangoError::ConfigurationError(format!("Failed to parse TOML: {e}")))
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, DjangoError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        DjangoError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, DjangoError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Builds settings from defaults plus environment overrides.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `DJANGO_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("DJANGO_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("DJANGO_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("DJANGO_SECRET_KEY") {
        settings.secret_key = val;
    }

    if let Some(val) = lookup("DJANGO_LOGIN_URL") {
        settings.login_url = val;
    }

    if let Some(val) = lookup("DJANGO_TEMPLATE_DIRS") {
        settings.templates.dirs = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
    }
}

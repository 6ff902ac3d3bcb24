//! Framework settings.
//!
//! [`Settings`] holds the handful of values the view layer consults at
//! request time: the debug flag, log level, login URL and template
//! configuration. A process-wide [`SETTINGS`] cell is configured once at
//! startup; code that runs before configuration (tests, mostly) reads the
//! defaults through [`LazySettings::get_or_default`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};

use serde::{Deserialize, Serialize};

/// Template engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// The template backend identifier.
    pub backend: String,
    /// Directories searched for `*.html` templates.
    pub dirs: Vec<PathBuf>,
    /// Backend-specific options (e.g. `autoescape`).
    pub options: HashMap<String, serde_json::Value>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            backend: "django_async.template.backends.tera".to_string(),
            dirs: Vec::new(),
            options: HashMap::new(),
        }
    }
}

/// Settings consumed by django-async.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Debug mode. Error responses include their message when enabled.
    pub debug: bool,
    pub secret_key: String,

    // ── Auth ─────────────────────────────────────────────────────────

    /// Where access mixins send anonymous users.
    pub login_url: String,

    // ── Templates ────────────────────────────────────────────────────

    pub templates: TemplateSettings,

    // ── Logging ──────────────────────────────────────────────────────

    /// An `EnvFilter` directive such as `"info"` or `"django_async_views=debug"`.
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            secret_key: String::new(),
            login_url: "/accounts/login/".to_string(),
            templates: TemplateSettings::default(),
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

/// A write-once holder for the process settings.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::default);

impl LazySettings {
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Installs the settings. Returns the rejected settings if they were
    /// already configured.
    pub fn try_configure(&self, settings: Settings) -> Result<(), Settings> {
        self.inner.set(settings)
    }

    /// Installs the settings, ignoring a second configuration attempt.
    pub fn configure(&self, settings: Settings) {
        if self.try_configure(settings).is_err() {
            tracing::warn!("Settings have already been configured; ignoring reconfiguration");
        }
    }

    /// Returns the configured settings, or `None` before configuration.
    pub fn get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns the configured settings or the defaults.
    pub fn get_or_default(&self) -> &Settings {
        self.inner.get().unwrap_or(&DEFAULT_SETTINGS)
    }

    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert!(s.secret_key.is_empty());
        assert_eq!(s.login_url, "/accounts/login/");
        assert_eq!(s.log_level, "info");
        assert!(s.templates.dirs.is_empty());
        assert!(s.templates.backend.ends_with("tera"));
    }

    #[test]
    fn test_lazy_settings_defaults_before_configure() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());
        assert!(lazy.get().is_none());
        assert_eq!(lazy.get_or_default().login_url, "/accounts/login/");
    }

    #[test]
    fn test_lazy_settings_configure_once() {
        let lazy = LazySettings::new();
        let first = Settings {
            login_url: "/login/".to_string(),
            ..Settings::default()
        };
        assert!(lazy.try_configure(first).is_ok());
        assert!(lazy.try_configure(Settings::default()).is_err());
        assert_eq!(lazy.get_or_default().login_url, "/login/");
    }

    #[test]
    fn test_settings_serde_round_trip_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{"debug": false}"#).unwrap();
        assert!(!s.debug);
        assert_eq!(s.login_url, "/accounts/login/");
    }
}

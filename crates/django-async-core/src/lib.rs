//! # django-async-core
//!
//! Error taxonomy, settings and logging shared by every django-async crate.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Settings struct and the process-wide [`SETTINGS`] cell
//! - [`settings_loader`] - Loading settings from TOML and the environment
//! - [`logging`] - Tracing subscriber setup and request spans

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

pub use error::{DjangoError, DjangoResult, ValidationError};
pub use settings::{Settings, SETTINGS};

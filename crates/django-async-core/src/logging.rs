//! Logging integration.
//!
//! Configures a [`tracing`] subscriber from [`Settings`] and creates
//! per-request spans.

use crate::settings::Settings;

/// Installs the global tracing subscriber.
///
/// `settings.log_level` is parsed as an `EnvFilter` directive. Debug mode
/// uses a pretty, human-readable format; otherwise events are emitted as
/// JSON. A second call is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one HTTP request.
///
/// ```
/// use django_async_core::logging::request_span;
///
/// let span = request_span("abc-123", "GET", "/authors/");
/// let _guard = span.enter();
/// tracing::info!("handling request");
/// ```
pub fn request_span(request_id: &str, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!("request", id = request_id, method = method, path = path)
}

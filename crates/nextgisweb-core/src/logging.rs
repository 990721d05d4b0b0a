//! Logging integration.
//!
//! Configures the global [`tracing`] subscriber from [`Settings`] and
//! provides the span used for request handling.

use crate::settings::Settings;

/// Installs the global tracing subscriber.
///
/// The filter is read from `settings.log_level` (any `EnvFilter` directive).
/// Debug mode uses pretty, human-readable output; otherwise JSON lines are
/// emitted. Installing twice is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

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

/// Creates a tracing span for an HTTP request.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::logging::request_span;
///
/// let span = request_span("GET", "/api/resource/1/feature_layer");
/// let _guard = span.enter();
/// tracing::info!("handling request");
/// ```
pub fn request_span(method: &str, path: &str) -> tracing::Span {
    tracing::info_span!("request", method = method, path = path)
}

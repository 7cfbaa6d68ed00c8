use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;

const SENTRY_DSN_ENV: &str = "SENTRY_DSN";

/// Initialise the Sentry client when `SENTRY_DSN` is set.
///
/// The returned guard must be held for the lifetime of the process so queued
/// events are flushed on shutdown.
pub fn init_once() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var(SENTRY_DSN_ENV).ok().filter(|d| !d.is_empty())?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(
                if cfg!(debug_assertions) {
                    "dev"
                } else {
                    "production"
                }
                .into(),
            ),
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Errors become Sentry events, warn/info/debug become breadcrumbs.
pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber,
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    SentryLayer::default()
        .span_filter(|meta| {
            matches!(
                *meta.level(),
                Level::DEBUG | Level::INFO | Level::WARN | Level::ERROR
            )
        })
        .event_filter(|meta| match *meta.level() {
            Level::ERROR => EventFilter::Event,
            Level::DEBUG | Level::INFO | Level::WARN => EventFilter::Breadcrumb,
            Level::TRACE => EventFilter::Ignore,
        })
}

//! Logging and tracing setup for the provider.
//!
//! All logs go to **stderr**: the host owns stdout for its plugin
//! handshake, and anything printed there breaks process startup.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: controls log levels (e.g. `info`, `debug`,
//!   `tidewave_provider=debug`)
//!
//! ```bash
//! RUST_LOG=tidewave_provider=debug terraform apply
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG`, defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set. Use
/// [`try_init_logging`] when the provider may be initialized twice.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .init();
}

/// Like [`init_logging`], but with a custom default level used when
/// `RUST_LOG` is not set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning `false` if a subscriber was
/// already set.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so
    // initialization itself is not unit-testable here; the filter parsing
    // is.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("tidewave_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,tidewave_provider=trace").is_ok());
    }
}

//! Logging initialization
//!
//! The engine itself only emits `tracing` events; hosts and test binaries
//! install a subscriber once at startup with one of these helpers.
//!
//! `RUST_LOG` always takes precedence over a filter passed in code or read
//! from [`LoggingConfig`](crate::config::LoggingConfig).
//!
//! ```rust
//! use cinnamon_core::utils::init_logging;
//!
//! init_logging(Some("cinnamon_core=debug"));
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used when neither `RUST_LOG` nor a configured filter is present
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the effective filter: `RUST_LOG`, then `filter`, then [`DEFAULT_FILTER`]
fn env_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER))
}

/// Install a human-readable subscriber on stderr.
///
/// Returns `false` if a global subscriber was already installed (e.g. by an
/// earlier test in the same binary); the existing one is kept.
pub fn init_logging(filter: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .try_init()
        .is_ok()
}

/// Initialize logging from an optional [`LoggingConfig`].
///
/// `json_format` falls back to plain output when the `json-logging` feature
/// is disabled.
pub fn init_logging_from_config(config: Option<&LoggingConfig>) -> bool {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            return init_json_logging(filter);
        }
    }
    init_logging(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_rejected() {
        init_logging(Some("warn"));
        // a global subscriber is now installed either by us or a sibling test
        assert!(!init_logging(Some("debug")));
    }

    #[test]
    fn test_from_config_without_config() {
        init_logging_from_config(None);
        assert!(!init_logging_from_config(Some(&LoggingConfig::default())));
    }
}

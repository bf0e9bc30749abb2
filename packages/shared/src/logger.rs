//! Logging setup utilities for the LGTM game server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crate and the binary log at `default_log_level` unless
/// the `RUST_LOG` environment variable overrides it.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "lgtm-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use lgtm_shared::logger::setup_logger;
///
/// setup_logger("lgtm-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the fallback filter directive used when `RUST_LOG` is unset.
///
/// Crate and binary names are normalized to their module form (`-` → `_`).
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "lgtm_server={level},{binary}={level},tower_http={level}",
        level = default_log_level,
        binary = binary_name.replace('-', "_"),
    )
}

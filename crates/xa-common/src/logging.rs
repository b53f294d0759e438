//! Structured Logging Configuration
//!
//! Provides configurable logging with:
//! - JSON output for log aggregation (`LOG_FORMAT=json`)
//! - Human-readable output otherwise
//! - Level taken from `RUST_LOG` when set, else from the configured level
//!
//! # Usage
//!
//! ```rust,ignore
//! use xa_common::logging::init_logging;
//!
//! fn main() {
//!     init_logging("xa-server", "warn", "text");
//!     tracing::warn!(user = %login, "Extended API endpoint invoked");
//! }
//! ```
//!
//! The configured level accepts both tracing names (`debug`, `warn`) and the
//! Python-style names the platform's other services use (`WARNING`,
//! `CRITICAL`), so one `LOG_LEVEL` value works across the deployment.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging for the given service.
///
/// `level` is used when `RUST_LOG` is absent or invalid. `format` selects
/// JSON output when equal to "json" (case-insensitive).
pub fn init_logging(service_name: &str, level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(level)));

    if format.eq_ignore_ascii_case("json") {
        init_json_logging(env_filter);
    } else {
        init_text_logging(env_filter);
    }

    tracing::debug!(service = service_name, "Logging initialized");
}

/// Map a configured level name onto a tracing filter directive.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => "warn",
    }
}

/// Initialize JSON logging for production.
fn init_json_logging(env_filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(true)
                .flatten_event(true)
                .with_span_events(FmtSpan::CLOSE)
        )
        .init();
}

/// Initialize human-readable text logging.
fn init_text_logging(env_filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true)
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_level_names_are_mapped() {
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("CRITICAL"), "error");
        assert_eq!(normalize_level("Info"), "info");
    }

    #[test]
    fn test_unknown_level_falls_back_to_warn() {
        assert_eq!(normalize_level("verbose"), "warn");
        assert_eq!(normalize_level(""), "warn");
    }

    #[test]
    fn test_env_filter_parsing() {
        for level in ["trace", "debug", "info", "warn", "error", "off"] {
            let filter = EnvFilter::new(normalize_level(level));
            drop(filter);
        }
    }
}

//! Structured logging setup for reporter binaries.
//!
//! Log output is the reporter's only failure surface: delivery problems are
//! never raised back to the host, so they have to be visible here.
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: "json" for JSON output (log aggregation), anything else
//!   for human-readable text (default)
//! - `RUST_LOG`: standard level filter, e.g. `RUST_LOG=er_reporter=debug`
//!   (default: info)
//!
//! # Usage
//!
//! ```rust,ignore
//! er_common::logging::init_logging("er-test");
//! tracing::info!(hash = %tag, "Error reported successfully");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging for the given service.
///
/// Reads `LOG_FORMAT` to pick JSON or text output and `RUST_LOG` for level
/// filtering (defaults to INFO).
pub fn init_logging(_service_name: &str) {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_format.eq_ignore_ascii_case("json") {
        init_json_logging(env_filter);
    } else {
        init_text_logging(env_filter);
    }
}

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
                .with_target(true)
                .flatten_event(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .init();
}

fn init_text_logging(env_filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_falls_back_to_info() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));
        drop(filter);
    }
}

//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the process-wide stdout subscriber
//! - [`capture_logs`] records events in memory for assertions in tests

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Default filter directive for the given debug flag.
pub fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Initialize the global tracing subscriber on stdout.
///
/// Debug mode writes compact human-readable lines at `debug`; otherwise the
/// subscriber emits one JSON object per line at `info`. `RUST_LOG` overrides
/// the level in both modes. Subsequent calls are no-ops.
pub fn init_subscriber(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stdout);

    // try_init fails if a global subscriber is already set
    let _ = if debug {
        builder.compact().try_init()
    } else {
        builder.json().flatten_event(true).try_init()
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

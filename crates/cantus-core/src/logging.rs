//! Structured logging setup with `tracing`.
//!
//! Pipeline stages emit spans and events through the `tracing` ecosystem;
//! request context (request ID, stage name) travels in span fields rather
//! than in log message text.

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG` takes precedence over the `level` argument when set.
///
/// # Arguments
///
/// * `level` - Minimum log level to display. Defaults to `"info"` in callers.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

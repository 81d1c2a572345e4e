//! Telemetry logic.

use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber for embedding applications.
///
/// Honors `RUST_LOG`, falling back to `info`. Does nothing when a
/// subscriber is already set, so tests can call it freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! # Logging Setup
//!
//! tracing-subscriber initialization for terminal front-ends.

use tracing_subscriber::EnvFilter;

/// Initializes structured logging.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies
/// (e.g. `"info,caja_sync=debug"`).
///
/// Call once at startup; calling twice panics inside tracing, so this is
/// the front-end's job, not a library concern.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

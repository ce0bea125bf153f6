//! Logging setup for hosts that do not install their own subscriber.
//!
//! The runner only emits `tracing` events. Hosts that already configure a
//! subscriber can skip this module entirely.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Returns `false`
/// when a global subscriber was already set, in which case nothing changes.
pub fn init_stderr_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

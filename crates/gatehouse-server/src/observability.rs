//! Tracing bootstrap.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global tracing subscriber.
///
/// The filter honors `RUST_LOG`; without it, `info` is the default with
/// `debug` for the gatehouse crates. Security events are emitted at `warn`
/// on the `gatehouse::security` target and are always visible.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gatehouse=debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

//! Tracing/log initialization for binaries embedding this crate.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted tracing subscriber filtered by `RUST_LOG`
/// (default `info`) and bridges `log` records into tracing.
///
/// Call once at process start. Safe to call again: a second call is a
/// no-op rather than a panic, so tests and embedders can both use it.
pub fn init_tracing() {
    // The db module and a few helpers emit via `log`.
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

//! Test tracing — routes `tracing` output through the test harness.

use tracing_subscriber::EnvFilter;

/// Installs a subscriber that writes through libtest's captured output.
///
/// Filters with `RUST_LOG`, defaulting to `info`. Safe to call from every
/// test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

//! Shared helpers for integration tests.

/// Installs a fmt subscriber once per test binary; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

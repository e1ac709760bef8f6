use tracing_subscriber::EnvFilter;

/// Install a test subscriber once per process.
///
/// Honors RUST_LOG so a failing scenario can be re-run with the
/// engine's transition events visible.
pub fn init_test_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

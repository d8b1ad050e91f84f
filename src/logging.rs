use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global `fmt` subscriber.
///
/// The level comes from `RUST_LOG` (default `info`), e.g.
/// `RUST_LOG=pallet_plan=debug` to see every recalculation.
///
/// ```no_run
/// pallet_plan::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(false)
        .init();
}

/// Debug-level subscriber writing through the test harness; safe to call repeatedly.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

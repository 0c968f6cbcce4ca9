use tracing_subscriber::EnvFilter;

/// Installs a JSON log subscriber filtered by `RUST_LOG` (default `info`).
///
/// CloudWatch stamps every line, so timestamps and colours are left out.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .init();
}

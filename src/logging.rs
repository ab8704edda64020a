use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Log to stderr, filtering according to RUST_LOG and defaulting to INFO.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `level` when set. An unrecognised level falls back
/// to `warn`. Library crates log through `log`; the subscriber's log bridge
/// picks those records up.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_ascii_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry().with(filter).with(layer).init();
}

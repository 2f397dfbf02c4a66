use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact stderr logging. `RUST_LOG` wins over the command-line level when set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(console).init();
}

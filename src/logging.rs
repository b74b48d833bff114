use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber: compact lines on stderr, level
/// from `RUST_LOG` when set.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber may already be set when embedded; keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Log to stderr. `RUST_LOG` wins when set; otherwise only errors, or
/// everything from `info` up when verbose.
pub fn init(verbose: bool) {
    let fallback = if verbose { "info" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

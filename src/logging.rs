//! Logging configuration for query-batch.
//!
//! Logs go to stderr so that stdout carries only the JSON results.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr, honoring `RUST_LOG`.
///
/// `verbose` raises the default level to `debug` for this crate.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{DEFAULT_FILTER},query_batch=debug"))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

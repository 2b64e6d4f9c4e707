//! Logging configuration using tracing
//!
//! Logs go to stderr so they never mix with rendered output on stdout.
//! `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug` for
//! skywatch itself when `--verbose` is passed.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "warn,skywatch=debug";

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    })
}

/// Initialize the tracing subscriber
///
/// # Errors
/// Returns an error if a global subscriber has already been installed
pub fn init(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .compact(),
        )
        .try_init()
}

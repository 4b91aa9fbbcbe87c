//! Logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LOG_FILTER_ENV};

/// Install the process-wide tracing subscriber. Logs go to stderr so command
/// output on stdout stays clean.
///
/// The filter comes from `SPLITBILL_LOG`, then `RUST_LOG`, then the config
/// default; `--verbose` always wins. Safe to call more than once.
pub fn init(config: &Config) {
    let filter = if config.verbose {
        EnvFilter::new(config.default_log_filter())
    } else {
        EnvFilter::try_from_env(LOG_FILTER_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

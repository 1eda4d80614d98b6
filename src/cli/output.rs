//! Everything the CLI writes outside the report itself: logging setup and
//! configuration-error diagnostics. Both go to stderr; stdout carries the report.

use tracing_subscriber::EnvFilter;

use crate::errors::VerdictError;

/// Environment variable holding the log filter, e.g. `VERDICT_LOG=debug`.
pub const LOG_ENV: &str = "VERDICT_LOG";

/// Install the stderr subscriber. Calling it twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Print a configuration error with its code and help through `miette`.
pub fn print_config_error(error: VerdictError) {
    eprintln!("{:?}", miette::Report::new(error));
}

//! Log subscriber setup.
//!
//! Logs go to stderr so scenario output on stdout stays clean. `RUST_LOG`
//! wins over the `-v` count when set.

use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Filter from `RUST_LOG`, else from the verbosity level
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_level()))
}

/// Install the global subscriber
pub fn init(config: &CliConfig) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.color.should_color()).try_init()
    };
    installed.map_err(|e| CliError::config(format!("cannot install log subscriber: {e}")))
}

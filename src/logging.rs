//! Logging setup using `tracing`.
//!
//! Events go to stderr. `KICKOFF_LOG` takes an `EnvFilter` directive and wins
//! over the verbosity flag.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "KICKOFF_LOG";

/// Level for a count of `-v` flags.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn build_env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: u8) {
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(verbosity))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the level follows `-q`/`-v`.
//! Logs go to stderr so command output on stdout stays clean.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ollamactl={}", verbosity.log_filter())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(matches!(verbosity, Verbosity::VeryVerbose))
        .try_init();
}

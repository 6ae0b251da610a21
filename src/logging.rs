// src/logging.rs

//! Logging setup for `devloop` using `tracing` + `tracing-subscriber`.
//!
//! Filter resolution:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `DEVLOOP_LOG`, any `EnvFilter` directive string
//!    (`debug`, `devloop::watch=trace,info`, ...)
//! 3. `info`
//!
//! Logs go to STDERR; the supervised server inherits stdout/stderr, so its
//! own output interleaves with ours.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "DEVLOOP_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = filter_for(cli_level, std::env::var(LOG_ENV_VAR).ok());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

fn filter_for(cli_level: Option<LogLevel>, env: Option<String>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(directive_for(level));
    }
    env.and_then(|directives| EnvFilter::try_new(directives.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

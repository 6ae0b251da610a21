// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every flag here is an override: when omitted, the value comes from
//! `Devloop.toml` (if present) and then from the built-in defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::DocsMode;

/// Command-line arguments for `devloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devloop",
    version,
    about = "Rebuild and restart a server binary whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Project root to watch and build in.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Path to the config file (TOML).
    ///
    /// Default: `Devloop.toml` inside ROOT, used only if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Entry module handed to the build toolchain (e.g. `main.go`).
    #[arg(long, value_name = "FILE")]
    pub entry: Option<String>,

    /// Output binary path, relative to ROOT.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Source suffix to watch (repeatable), e.g. `--ext go --ext tmpl`.
    #[arg(long = "ext", value_name = "SUFFIX")]
    pub extensions: Vec<String>,

    /// Quiet period after the first change before a rebuild starts
    /// (e.g. `300ms`, `1s`).
    #[arg(long, value_name = "DURATION")]
    pub debounce: Option<String>,

    /// When to run the documentation generator.
    #[arg(long, value_name = "MODE")]
    pub docs: Option<DocsMode>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVLOOP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build once and exit; do not start the server or watch.
    #[arg(long)]
    pub once: bool,

    /// Resolve and print the effective settings, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

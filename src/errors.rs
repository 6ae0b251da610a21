// src/errors.rs

//! Crate-wide error type.
//!
//! Only `ConfigError` and `WatchError` are allowed to end the process; the
//! build, docs and launch variants are reported by the controller and the
//! loop keeps going.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Documentation generation failed: {0}")]
    DocGenError(String),

    #[error("Build failed:\n{0}")]
    BuildError(String),

    #[error("Failed to launch server: {0}")]
    LaunchError(String),

    #[error("File watcher failed: {0}")]
    WatchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for DevloopError {
    fn from(err: notify::Error) -> Self {
        DevloopError::WatchError(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;

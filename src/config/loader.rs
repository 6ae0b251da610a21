use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{DEFAULT_CONFIG_FILE, RawConfigFile, Settings};
use crate::config::validate::resolve_settings;
use crate::errors::{DevloopError, Result};

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; no semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Resolve the settings for this invocation.
///
/// - The project root must exist; otherwise `ConfigError` before anything
///   else happens.
/// - An explicit `--config` must exist. The default `<root>/Devloop.toml` is
///   optional.
/// - CLI flags override file values, which override built-in defaults.
pub fn load_settings(args: &CliArgs) -> Result<Settings> {
    ensure_root_exists(&args.root)?;

    let mut raw = match &args.config {
        Some(path) => {
            if !path.is_file() {
                return Err(DevloopError::ConfigError(format!(
                    "config file {:?} does not exist",
                    path
                )));
            }
            load_from_path(path)?
        }
        None => {
            let candidate = default_config_path(&args.root);
            if candidate.is_file() {
                debug!(path = ?candidate, "using project config file");
                load_from_path(&candidate)?
            } else {
                debug!("no config file found; using defaults");
                RawConfigFile::default()
            }
        }
    };

    apply_cli_overrides(&mut raw, args);
    resolve_settings(&args.root, raw)
}

/// `<root>/Devloop.toml`.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}

fn ensure_root_exists(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(DevloopError::ConfigError(format!(
            "project root {:?} does not exist or is not a directory",
            root
        )));
    }
    Ok(())
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(entry) = &args.entry {
        raw.project.entry = entry.clone();
    }
    if let Some(output) = &args.output {
        raw.project.output = output.clone();
    }
    if !args.extensions.is_empty() {
        raw.watch.extensions = args.extensions.clone();
    }
    if let Some(debounce) = &args.debounce {
        raw.watch.debounce = debounce.clone();
    }
    if let Some(mode) = args.docs {
        raw.docs.mode = mode;
    }
}

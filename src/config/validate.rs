use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::Glob;

use crate::config::model::{
    BuildSettings, DocsSettings, RawConfigFile, ServerSettings, Settings, WatchSettings,
};
use crate::errors::{DevloopError, Result};
use crate::types::DocsMode;

/// Validate a raw config against a project root and resolve it into
/// [`Settings`].
pub fn resolve_settings(root: &Path, raw: RawConfigFile) -> Result<Settings> {
    let root = root.canonicalize().map_err(|e| {
        DevloopError::ConfigError(format!("project root {:?} is not usable: {e}", root))
    })?;
    if !root.is_dir() {
        return Err(DevloopError::ConfigError(format!(
            "project root {:?} is not a directory",
            root
        )));
    }

    validate_project(&raw)?;
    validate_commands(&raw)?;
    validate_excludes(&raw.watch.exclude)?;

    let extensions = normalize_extensions(&raw.watch.extensions)?;
    let debounce = parse_duration_field("watch.debounce", &raw.watch.debounce)?;
    let stop_timeout = parse_duration_field("server.stop_timeout", &raw.server.stop_timeout)?;
    let build_timeout = raw
        .build
        .timeout
        .as_deref()
        .map(|s| parse_duration_field("build.timeout", s))
        .transpose()?;

    let output = under_root(&root, &raw.project.output);
    if output.is_dir() {
        return Err(DevloopError::ConfigError(format!(
            "output path {:?} is a directory",
            output
        )));
    }

    Ok(Settings {
        entry: raw.project.entry,
        output,
        build: BuildSettings {
            cmd: raw.build.cmd,
            timeout: build_timeout,
        },
        docs: DocsSettings {
            mode: raw.docs.mode,
            cmd: raw.docs.cmd,
            artifact: under_root(&root, &raw.docs.artifact),
        },
        watch: WatchSettings {
            extensions,
            exclude: raw.watch.exclude,
            debounce,
            use_hash: raw.watch.use_hash,
        },
        server: ServerSettings {
            args: raw.server.args,
            stop_timeout,
        },
        root,
    })
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.entry.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[project].entry must not be empty".to_string(),
        ));
    }
    if cfg.project.output.as_os_str().is_empty() {
        return Err(DevloopError::ConfigError(
            "[project].output must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.cmd.first().is_none_or(|p| p.trim().is_empty()) {
        return Err(DevloopError::ConfigError(
            "[build].cmd must name a program".to_string(),
        ));
    }
    if cfg.docs.mode != DocsMode::Never && cfg.docs.cmd.first().is_none_or(|p| p.trim().is_empty())
    {
        return Err(DevloopError::ConfigError(
            "[docs].cmd must name a program unless docs.mode = \"never\"".to_string(),
        ));
    }
    Ok(())
}

fn validate_excludes(patterns: &[String]) -> Result<()> {
    for pat in patterns {
        Glob::new(pat).map_err(|e| {
            DevloopError::ConfigError(format!("invalid exclude pattern '{pat}': {e}"))
        })?;
    }
    Ok(())
}

fn normalize_extensions(raw: &[String]) -> Result<Vec<String>> {
    let exts: Vec<String> = raw
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect();

    if exts.is_empty() {
        return Err(DevloopError::ConfigError(
            "[watch].extensions must contain at least one suffix".to_string(),
        ));
    }
    Ok(exts)
}

fn parse_duration_field(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|e| {
        DevloopError::ConfigError(format!("invalid duration for {field}: '{value}' ({e})"))
    })
}

fn under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::DocsMode;

/// File name looked up inside the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Devloop.toml";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// entry = "main.go"
/// output = "server"
///
/// [build]
/// cmd = ["go", "build", "-o", "{output}", "{entry}"]
///
/// [docs]
/// mode = "if-missing"
/// cmd = ["swag", "init"]
/// artifact = "docs/swagger.json"
///
/// [watch]
/// extensions = ["go"]
/// debounce = "300ms"
///
/// [server]
/// stop_timeout = "5s"
/// ```
///
/// All sections are optional and have defaults matching a Go HTTP server
/// project. This is the unvalidated form; see [`Settings`] for the resolved
/// one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub docs: DocsSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Entry module passed to the build toolchain as `{entry}`.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Output binary, relative to the project root.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_entry() -> String {
    "main.go".to_string()
}

fn default_output() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("server.exe")
    } else {
        PathBuf::from("server")
    }
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            output: default_output(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Toolchain argv. `{entry}` and `{output}` are substituted per build.
    #[serde(default = "default_build_cmd")]
    pub cmd: Vec<String>,

    /// Optional upper bound on a single build, e.g. `"5m"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

fn default_build_cmd() -> Vec<String> {
    ["go", "build", "-o", "{output}", "{entry}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: default_build_cmd(),
            timeout: None,
        }
    }
}

/// `[docs]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DocsSection {
    #[serde(default)]
    pub mode: DocsMode,

    #[serde(default = "default_docs_cmd")]
    pub cmd: Vec<String>,

    /// Artifact whose presence means "docs already generated".
    #[serde(default = "default_docs_artifact")]
    pub artifact: PathBuf,
}

fn default_docs_cmd() -> Vec<String> {
    vec!["swag".to_string(), "init".to_string()]
}

fn default_docs_artifact() -> PathBuf {
    PathBuf::from("docs").join("swagger.json")
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            mode: DocsMode::default(),
            cmd: default_docs_cmd(),
            artifact: default_docs_artifact(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// File suffixes that trigger a rebuild, with or without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns (relative to the root) that never trigger a rebuild.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Ignore events for files whose content hash did not change.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["go".to_string()]
}

fn default_debounce() -> String {
    "300ms".to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
            debounce: default_debounce(),
            use_hash: false,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Extra arguments for the built server binary.
    #[serde(default)]
    pub args: Vec<String>,

    /// Grace period between the termination request and a forced kill.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: String,
}

fn default_stop_timeout() -> String {
    "5s".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

/// Fully resolved settings.
///
/// All paths are absolute and all durations parsed. Obtain one through
/// [`crate::config::load_settings`] or [`crate::config::resolve_settings`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub entry: String,
    pub output: PathBuf,
    pub build: BuildSettings,
    pub docs: DocsSettings,
    pub watch: WatchSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub cmd: Vec<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct DocsSettings {
    pub mode: DocsMode,
    pub cmd: Vec<String>,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Normalized: no leading dot, never empty.
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub debounce: Duration,
    pub use_hash: bool,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub args: Vec<String>,
    pub stop_timeout: Duration,
}

impl Settings {
    /// Where the toolchain writes before the binary is installed at `output`.
    pub fn staged_output(&self) -> PathBuf {
        staged_path_for(&self.output)
    }
}

/// Staging path used for a given output binary: `.<name>.devloop-staged` in
/// the same directory, so the final install is a same-filesystem rename.
pub fn staged_path_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "server".to_string());
    output.with_file_name(format!(".{name}.devloop-staged"))
}

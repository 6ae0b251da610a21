use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// When the documentation generator runs before a build.
///
/// - `IfMissing`: only when the docs artifact does not exist yet (default).
///   Docs go stale after the first run until the artifact is deleted.
/// - `Always`: before every build.
/// - `Never`: the docs step is skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocsMode {
    #[default]
    IfMissing,
    Always,
    Never,
}

impl FromStr for DocsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "if-missing" | "if_missing" | "missing" => Ok(DocsMode::IfMissing),
            "always" => Ok(DocsMode::Always),
            "never" | "off" => Ok(DocsMode::Never),
            other => Err(format!(
                "invalid docs mode: {other} (expected \"if-missing\", \"always\" or \"never\")"
            )),
        }
    }
}

impl fmt::Display for DocsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocsMode::IfMissing => "if-missing",
            DocsMode::Always => "always",
            DocsMode::Never => "never",
        };
        f.write_str(s)
    }
}

/// Lifecycle of the supervised server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    NotStarted,
    Running,
    /// Termination was requested and we are waiting for the exit.
    Terminating,
    Stopped,
}

/// States of the rebuild controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Building,
    Restarting,
    /// Terminal.
    ShuttingDown,
}

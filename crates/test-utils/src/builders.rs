#![allow(dead_code)]

use std::path::Path;

use devloop::config::{RawConfigFile, Settings, resolve_settings};
use devloop::types::DocsMode;

/// Builder for resolved `Settings` to simplify test setup.
///
/// Starts from the built-in defaults; `build` resolves against a real
/// directory, so pair it with a `tempfile::TempDir`.
pub struct SettingsBuilder {
    raw: RawConfigFile,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfigFile::default(),
        }
    }

    pub fn entry(mut self, entry: &str) -> Self {
        self.raw.project.entry = entry.to_string();
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.raw.project.output = output.into();
        self
    }

    pub fn build_cmd(mut self, argv: &[&str]) -> Self {
        self.raw.build.cmd = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    /// `sh -c <script> {output}`; the script sees the output path as `$0`.
    pub fn build_script(self, script: &str) -> Self {
        self.build_cmd(&["sh", "-c", script, "{output}"])
    }

    pub fn build_timeout(mut self, timeout: &str) -> Self {
        self.raw.build.timeout = Some(timeout.to_string());
        self
    }

    pub fn docs_mode(mut self, mode: DocsMode) -> Self {
        self.raw.docs.mode = mode;
        self
    }

    pub fn docs_cmd(mut self, argv: &[&str]) -> Self {
        self.raw.docs.cmd = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.raw.watch.extensions.push(ext.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn debounce(mut self, debounce: &str) -> Self {
        self.raw.watch.debounce = debounce.to_string();
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.raw.watch.use_hash = val;
        self
    }

    pub fn stop_timeout(mut self, timeout: &str) -> Self {
        self.raw.server.stop_timeout = timeout.to_string();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.raw
    }

    pub fn build(self, root: &Path) -> Settings {
        resolve_settings(root, self.raw).expect("Failed to resolve settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

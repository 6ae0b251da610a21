// src/build/builder.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::build::command::{CommandTemplate, combined_output};
use crate::config::{Settings, staged_path_for};
use crate::errors::{DevloopError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::DocsMode;

/// Outcome of one toolchain invocation.
///
/// On success `artifact` points at the staged binary; the output path itself
/// is only touched by [`Builder::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    /// Toolchain output (errors on failure, warnings on success).
    pub diagnostics: Option<String>,
    pub duration: Duration,
    pub artifact: Option<PathBuf>,
}

impl BuildResult {
    pub fn succeeded(artifact: PathBuf, diagnostics: Option<String>, duration: Duration) -> Self {
        Self {
            success: true,
            diagnostics,
            duration,
            artifact: Some(artifact),
        }
    }

    pub fn failed(diagnostics: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            diagnostics: Some(diagnostics.into()),
            duration,
            artifact: None,
        }
    }

    /// The `BuildError` this result represents, if it is a failure.
    pub fn to_error(&self) -> Option<DevloopError> {
        if self.success {
            return None;
        }
        Some(DevloopError::BuildError(
            self.diagnostics
                .clone()
                .unwrap_or_else(|| "toolchain failed without output".to_string()),
        ))
    }
}

/// What `ensure_docs` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsOutcome {
    Generated,
    /// Artifact already present.
    Skipped,
    /// `docs.mode = "never"`.
    Disabled,
}

/// Runs the documentation generator and the build toolchain.
#[derive(Debug, Clone)]
pub struct Builder {
    entry: String,
    build_cmd: CommandTemplate,
    build_timeout: Option<Duration>,
    docs_mode: DocsMode,
    docs_cmd: CommandTemplate,
    docs_artifact: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Builder {
    pub fn new(settings: &Settings) -> Self {
        Self::with_fs(settings, Arc::new(RealFileSystem))
    }

    pub fn with_fs(settings: &Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            entry: settings.entry.clone(),
            build_cmd: CommandTemplate::new(settings.build.cmd.clone()),
            build_timeout: settings.build.timeout,
            docs_mode: settings.docs.mode,
            docs_cmd: CommandTemplate::new(settings.docs.cmd.clone()),
            docs_artifact: settings.docs.artifact.clone(),
            fs,
        }
    }

    /// Generate docs according to the configured mode.
    ///
    /// In `if-missing` mode an existing artifact is never regenerated.
    pub async fn ensure_docs(&self, root: &Path) -> Result<DocsOutcome> {
        match self.docs_mode {
            DocsMode::Never => return Ok(DocsOutcome::Disabled),
            DocsMode::IfMissing if self.fs.exists(&self.docs_artifact) => {
                info!(artifact = ?self.docs_artifact, "docs already exist; skipping generation");
                return Ok(DocsOutcome::Skipped);
            }
            DocsMode::IfMissing | DocsMode::Always => {}
        }

        info!(cmd = %self.docs_cmd.display(), "generating docs");
        let mut cmd = self
            .docs_cmd
            .to_command(root, &self.entry, &self.docs_artifact)
            .ok_or_else(|| DevloopError::DocGenError("docs command is empty".to_string()))?;

        let output = cmd.output().await.map_err(|e| {
            DevloopError::DocGenError(format!("running '{}': {e}", self.docs_cmd.display()))
        })?;

        if !output.status.success() {
            let text = combined_output(&output.stdout, &output.stderr);
            return Err(DevloopError::DocGenError(format!(
                "'{}' exited with {}{}",
                self.docs_cmd.display(),
                output.status,
                if text.is_empty() { String::new() } else { format!(":\n{text}") }
            )));
        }

        debug!("docs generated");
        Ok(DocsOutcome::Generated)
    }

    /// Compile the entry module.
    ///
    /// The toolchain writes to a staging path next to `output`; `output`
    /// itself is left untouched whatever happens here.
    pub async fn build(&self, root: &Path, output: &Path) -> BuildResult {
        let started = Instant::now();
        let staged = staged_path_for(output);

        if let Err(err) = self.fs.remove_file(&staged) {
            warn!(path = ?staged, error = %err, "could not clear stale staged binary");
        }

        let Some(mut cmd) = self.build_cmd.to_command(root, &self.entry, &staged) else {
            return BuildResult::failed("build command is empty", started.elapsed());
        };

        info!(cmd = %self.build_cmd.display(), entry = %self.entry, "building");

        let run = cmd.output();
        let output_res = match self.build_timeout {
            Some(limit) => match timeout(limit, run).await {
                Ok(res) => res,
                Err(_) => {
                    // Dropping the future kills the toolchain (kill_on_drop).
                    self.discard_staged(&staged);
                    return BuildResult::failed(
                        format!("build timed out after {}", humantime::format_duration(limit)),
                        started.elapsed(),
                    );
                }
            },
            None => run.await,
        };

        let out = match output_res {
            Ok(out) => out,
            Err(e) => {
                self.discard_staged(&staged);
                return BuildResult::failed(
                    format!("running '{}': {e}", self.build_cmd.display()),
                    started.elapsed(),
                );
            }
        };

        let text = combined_output(&out.stdout, &out.stderr);
        let elapsed = started.elapsed();

        if !out.status.success() {
            self.discard_staged(&staged);
            let diag = if text.is_empty() {
                format!("toolchain exited with {}", out.status)
            } else {
                text
            };
            return BuildResult::failed(diag, elapsed);
        }

        if !self.fs.is_file(&staged) {
            return BuildResult::failed(
                format!(
                    "toolchain reported success but produced no binary at {:?}",
                    staged
                ),
                elapsed,
            );
        }

        let diagnostics = (!text.is_empty()).then_some(text);
        BuildResult::succeeded(staged, diagnostics, elapsed)
    }

    /// Move a staged artifact over the output path.
    ///
    /// Called after the old server has stopped so platforms that lock running
    /// executables can replace the file.
    pub fn install(&self, artifact: &Path, output: &Path) -> Result<()> {
        self.fs.rename(artifact, output).map_err(|e| {
            DevloopError::LaunchError(format!("installing built binary at {:?}: {e:#}", output))
        })
    }

    fn discard_staged(&self, staged: &Path) {
        if let Err(err) = self.fs.remove_file(staged) {
            warn!(path = ?staged, error = %err, "could not remove staged binary");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawConfigFile, resolve_settings};
    use crate::fs::mock::MockFileSystem;

    fn settings_with(root: &Path, build: &[&str], docs: &[&str]) -> Settings {
        let mut raw = RawConfigFile::default();
        raw.build.cmd = build.iter().map(|s| s.to_string()).collect();
        raw.docs.cmd = docs.iter().map(|s| s.to_string()).collect();
        resolve_settings(root, raw).unwrap()
    }

    #[tokio::test]
    async fn existing_docs_artifact_skips_generator() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &["true"], &["definitely-not-a-program"]);
        let fs = MockFileSystem::new();
        fs.add_file(&settings.docs.artifact, b"{}".to_vec());

        let builder = Builder::with_fs(&settings, Arc::new(fs));
        let outcome = builder.ensure_docs(&settings.root).await.unwrap();
        assert_eq!(outcome, DocsOutcome::Skipped);
    }

    #[tokio::test]
    async fn docs_mode_never_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with(dir.path(), &["true"], &["definitely-not-a-program"]);
        settings.docs.mode = DocsMode::Never;

        let builder = Builder::new(&settings);
        assert_eq!(
            builder.ensure_docs(&settings.root).await.unwrap(),
            DocsOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn missing_docs_generator_is_docgen_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &["true"], &["definitely-not-a-program"]);

        let builder = Builder::new(&settings);
        let err = builder.ensure_docs(&settings.root).await.unwrap_err();
        assert!(matches!(err, DevloopError::DocGenError(_)));
    }

    #[tokio::test]
    async fn missing_toolchain_is_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &["definitely-not-a-compiler"], &["true"]);

        let builder = Builder::new(&settings);
        let result = builder.build(&settings.root, &settings.output).await;
        assert!(!result.success);
        assert!(result.artifact.is_none());
        assert!(matches!(result.to_error(), Some(DevloopError::BuildError(_))));
    }

    #[test]
    fn install_moves_staged_binary_in_mock_fs() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &["true"], &["true"]);
        let fs = MockFileSystem::new();
        let staged = settings.staged_output();
        fs.add_file(&staged, b"new".to_vec());
        fs.add_file(&settings.output, b"old".to_vec());

        let builder = Builder::with_fs(&settings, Arc::new(fs.clone()));
        builder.install(&staged, &settings.output).unwrap();

        assert_eq!(fs.contents(&settings.output), Some(b"new".to_vec()));
        assert_eq!(fs.contents(&staged), None);
    }

    #[test]
    fn install_without_artifact_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &["true"], &["true"]);
        let builder = Builder::with_fs(&settings, Arc::new(MockFileSystem::new()));

        let err = builder
            .install(&settings.staged_output(), &settings.output)
            .unwrap_err();
        assert!(matches!(err, DevloopError::LaunchError(_)));
    }
}

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devloop::build::{BuildBackend, BuildResult, DocsOutcome};
use devloop::config::staged_path_for;
use devloop::errors::{DevloopError, Result};
use devloop::exec::ServerBackend;
use tracing::debug;

/// One scripted build outcome.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedBuild {
    pub success: bool,
    pub takes: Duration,
}

impl ScriptedBuild {
    pub fn ok() -> Self {
        Self {
            success: true,
            takes: Duration::ZERO,
        }
    }

    pub fn fail() -> Self {
        Self {
            success: false,
            takes: Duration::ZERO,
        }
    }

    pub fn taking(mut self, d: Duration) -> Self {
        self.takes = d;
        self
    }
}

#[derive(Debug, Default)]
struct BuildLog {
    script: VecDeque<ScriptedBuild>,
    started: usize,
    finished: usize,
    docs_runs: usize,
    installs: Vec<PathBuf>,
}

/// A fake builder that:
/// - plays back scripted outcomes (success once the script runs out)
/// - counts started and finished builds
/// - records installs instead of touching the filesystem.
///
/// Clones share state, so a test keeps one clone for inspection.
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    log: Arc<Mutex<BuildLog>>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: impl IntoIterator<Item = ScriptedBuild>) -> Self {
        let builder = Self::default();
        builder.log.lock().unwrap().script.extend(script);
        builder
    }

    pub fn builds_started(&self) -> usize {
        self.log.lock().unwrap().started
    }

    pub fn builds_finished(&self) -> usize {
        self.log.lock().unwrap().finished
    }

    pub fn docs_runs(&self) -> usize {
        self.log.lock().unwrap().docs_runs
    }

    pub fn installs(&self) -> Vec<PathBuf> {
        self.log.lock().unwrap().installs.clone()
    }
}

impl BuildBackend for FakeBuilder {
    fn ensure_docs<'a>(
        &'a mut self,
        _root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<DocsOutcome>> + Send + 'a>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            log.lock().unwrap().docs_runs += 1;
            Ok(DocsOutcome::Skipped)
        })
    }

    fn build<'a>(
        &'a mut self,
        _root: &'a Path,
        output: &'a Path,
    ) -> Pin<Box<dyn Future<Output = BuildResult> + Send + 'a>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            let next = {
                let mut guard = log.lock().unwrap();
                guard.started += 1;
                guard.script.pop_front().unwrap_or_else(ScriptedBuild::ok)
            };

            if !next.takes.is_zero() {
                tokio::time::sleep(next.takes).await;
            }

            log.lock().unwrap().finished += 1;
            debug!(success = next.success, "fake build finished");
            if next.success {
                BuildResult::succeeded(staged_path_for(output), None, next.takes)
            } else {
                BuildResult::failed("main.go:3:2: undefined: nope", next.takes)
            }
        })
    }

    fn install(&mut self, artifact: &Path, _output: &Path) -> Result<()> {
        self.log.lock().unwrap().installs.push(artifact.to_path_buf());
        Ok(())
    }
}

/// What happened to the fake server, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCall {
    Start(u32),
    Stop(u32),
}

#[derive(Debug, Default)]
struct ServerLog {
    calls: Vec<ServerCall>,
    running: Option<u32>,
    next_pid: u32,
    fail_starts: bool,
    stop_delay: Duration,
    stopping: bool,
}

/// A fake server backend that hands out pids 1, 2, 3... and records every
/// start and stop.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    log: Arc<Mutex<ServerLog>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `stop` of a running server take `delay`.
    pub fn with_stop_delay(self, delay: Duration) -> Self {
        self.log.lock().unwrap().stop_delay = delay;
        self
    }

    /// Whether a `stop` is in progress right now.
    pub fn stopping(&self) -> bool {
        self.log.lock().unwrap().stopping
    }

    /// Make every following `start` fail with a `LaunchError`.
    pub fn fail_starts(&self, fail: bool) {
        self.log.lock().unwrap().fail_starts = fail;
    }

    pub fn calls(&self) -> Vec<ServerCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn running_pid(&self) -> Option<u32> {
        self.log.lock().unwrap().running
    }

    pub fn starts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ServerCall::Start(_)))
            .count()
    }
}

impl ServerBackend for FakeServer {
    fn start<'a>(
        &'a mut self,
        executable: &'a Path,
        _working_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u32>> + Send + 'a>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            let mut guard = log.lock().unwrap();
            assert!(
                guard.running.is_none(),
                "start called while a server is still running"
            );
            if guard.fail_starts {
                return Err(DevloopError::LaunchError(format!(
                    "cannot launch {:?}",
                    executable
                )));
            }
            guard.next_pid += 1;
            let pid = guard.next_pid;
            guard.running = Some(pid);
            guard.calls.push(ServerCall::Start(pid));
            debug!(pid, "fake server started");
            Ok(pid)
        })
    }

    fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            let delay = {
                let mut guard = log.lock().unwrap();
                if guard.running.is_none() {
                    return Ok(());
                }
                guard.stopping = true;
                guard.stop_delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let mut guard = log.lock().unwrap();
            guard.stopping = false;
            if let Some(pid) = guard.running.take() {
                guard.calls.push(ServerCall::Stop(pid));
                debug!(pid, "fake server stopped");
            }
            Ok(())
        })
    }

    fn is_running(&mut self) -> bool {
        self.log.lock().unwrap().running.is_some()
    }

    fn pid(&mut self) -> Option<u32> {
        self.log.lock().unwrap().running
    }
}

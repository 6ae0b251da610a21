// src/exec/supervisor.rs

//! Lifecycle of the single supervised server process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerSettings;
use crate::errors::{DevloopError, Result};
use crate::exec::signal::request_termination;
use crate::types::ServerState;

/// Handle for one launched server binary.
///
/// Owned exclusively by [`ProcessSupervisor`]. The child is spawned with
/// `kill_on_drop`, so dropping a handle that was never stopped still kills
/// the process.
#[derive(Debug)]
pub struct ServerProcess {
    pid: u32,
    state: ServerState,
    child: Child,
}

impl ServerProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Non-blocking liveness check.
    ///
    /// Reaps the child if it already exited, which moves the handle to
    /// `Stopped`.
    pub fn is_running(&mut self) -> bool {
        match self.state {
            ServerState::Running | ServerState::Terminating => match self.child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    info!(pid = self.pid, %status, "server process exited on its own");
                    self.state = ServerState::Stopped;
                    false
                }
                Err(err) => {
                    // Cannot tell; treat as alive so stop() still waits on it.
                    warn!(pid = self.pid, error = %err, "failed to poll server process");
                    true
                }
            },
            ServerState::NotStarted | ServerState::Stopped => false,
        }
    }

    /// Request graceful termination, wait up to `grace`, then force-kill.
    ///
    /// Only returns `Ok` once the child has been reaped.
    async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        info!(pid = self.pid, "stopping server");
        self.state = ServerState::Terminating;

        if let Err(err) = request_termination(&mut self.child, self.pid) {
            warn!(pid = self.pid, error = %err, "termination request failed; killing");
            return self.kill().await;
        }

        match timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = self.pid, %status, "server exited after termination request");
                self.state = ServerState::Stopped;
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(pid = self.pid, error = %err, "waiting for server failed; killing");
                self.kill().await
            }
            Err(_elapsed) => {
                warn!(
                    pid = self.pid,
                    grace_ms = grace.as_millis() as u64,
                    "server ignored termination request; killing"
                );
                self.kill().await
            }
        }
    }

    async fn kill(&mut self) -> Result<()> {
        // `Child::kill` sends SIGKILL / TerminateProcess and then waits.
        self.child.kill().await?;
        self.state = ServerState::Stopped;
        Ok(())
    }
}

/// Owns at most one running server process.
///
/// `stop` always completes (the child is reaped) before returning, and
/// `start` stops any tracked process first, so two server instances never
/// overlap.
#[derive(Debug)]
pub struct ProcessSupervisor {
    current: Option<ServerProcess>,
    args: Vec<String>,
    stop_timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(args: Vec<String>, stop_timeout: Duration) -> Self {
        Self {
            current: None,
            args,
            stop_timeout,
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(settings.args.clone(), settings.stop_timeout)
    }

    /// Launch `executable` with `working_dir` as its cwd.
    ///
    /// Returns the new pid. Fails with `LaunchError` when the binary is
    /// missing, not executable, or cannot be spawned.
    pub async fn start(&mut self, executable: &Path, working_dir: &Path) -> Result<u32> {
        self.stop().await?;

        check_executable(executable)?;

        let mut cmd = Command::new(executable);
        cmd.args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = spawn_with_retry(&mut cmd).await.map_err(|e| {
            DevloopError::LaunchError(format!("spawning {:?}: {e}", executable))
        })?;

        let pid = child.id().ok_or_else(|| {
            DevloopError::LaunchError(format!("{:?} exited before it could be tracked", executable))
        })?;

        info!(pid, exe = ?executable, "server started");
        self.current = Some(ServerProcess {
            pid,
            state: ServerState::Running,
            child,
        });
        Ok(pid)
    }

    /// Stop the tracked process, if any. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        match self.current.as_mut() {
            Some(process) => process.terminate(self.stop_timeout).await,
            None => Ok(()),
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.current.as_mut().is_some_and(|p| p.is_running())
    }

    /// Pid of the tracked process while it is running.
    pub fn pid(&mut self) -> Option<u32> {
        let process = self.current.as_mut()?;
        process.is_running().then_some(process.pid)
    }

    pub fn status(&self) -> ServerState {
        self.current
            .as_ref()
            .map(|p| p.state())
            .unwrap_or(ServerState::NotStarted)
    }
}

/// A binary that was just written can be briefly "text file busy" on Linux
/// while another thread's fork still holds the write descriptor.
async fn spawn_with_retry(cmd: &mut Command) -> std::io::Result<Child> {
    let mut attempts = 0;
    loop {
        match cmd.spawn() {
            Err(e) if e.kind() == std::io::ErrorKind::ExecutableFileBusy && attempts < 5 => {
                attempts += 1;
                debug!(attempts, "executable busy; retrying spawn");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            other => return other,
        }
    }
}

fn check_executable(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| {
        DevloopError::LaunchError(format!("server binary {:?} is missing: {e}", path))
    })?;
    if !meta.is_file() {
        return Err(DevloopError::LaunchError(format!(
            "server binary {:?} is not a file",
            path
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(DevloopError::LaunchError(format!(
                "server binary {:?} is not executable",
                path
            )));
        }
    }

    Ok(())
}

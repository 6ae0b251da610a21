// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::build::{BuildBackend, BuildResult};
use crate::errors::{DevloopError, Result};
use crate::exec::ServerBackend;
use crate::watch::Subscription;

use super::core::ControllerCore;
use super::{CoreCommand, CoreStep, RuntimeEvent, ShutdownReason};

/// Starts the file watcher once the initial cycle has finished.
pub type WatchStarter = Box<dyn FnOnce() -> Result<Subscription> + Send>;

/// Drives [`ControllerCore`] in response to `RuntimeEvent`s and performs the
/// builds and restarts it asks for.
///
/// Interrupts are observed during the debounce window and while a build is
/// running (the build is abandoned and its toolchain killed). A stop or start
/// in flight is always allowed to finish; the interrupt is picked up at the
/// next checkpoint.
pub struct Runtime<B: BuildBackend, S: ServerBackend> {
    core: ControllerCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    events_open: bool,
    builder: B,
    server: S,
    root: PathBuf,
    output: PathBuf,
    debounce: Duration,
    staged: Option<PathBuf>,
    watch_starter: Option<WatchStarter>,
    subscription: Option<Subscription>,
    exit_reason: Option<ShutdownReason>,
}

impl<B: BuildBackend, S: ServerBackend> fmt::Debug for Runtime<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("root", &self.root)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<B: BuildBackend, S: ServerBackend> Runtime<B, S> {
    pub fn new(
        event_rx: mpsc::Receiver<RuntimeEvent>,
        builder: B,
        server: S,
        root: PathBuf,
        output: PathBuf,
        debounce: Duration,
    ) -> Self {
        Self {
            core: ControllerCore::new(),
            event_rx,
            events_open: true,
            builder,
            server,
            root,
            output,
            debounce,
            staged: None,
            watch_starter: None,
            subscription: None,
            exit_reason: None,
        }
    }

    /// Start watching through `starter` after the initial build-and-launch.
    pub fn with_watcher(mut self, starter: WatchStarter) -> Self {
        self.watch_starter = Some(starter);
        self
    }

    /// Run until shutdown.
    ///
    /// Whatever way the loop ends, the server is stopped and the watcher
    /// released before this returns.
    pub async fn run(mut self) -> Result<()> {
        info!("devloop runtime started");

        let outcome = self.drive().await;

        if let Err(err) = &outcome {
            error!(error = %err, "runtime failed; cleaning up");
        }
        self.release_all().await;

        info!("runtime exiting");
        outcome
    }

    /// Main event loop.
    ///
    /// - Executes the commands of the current step.
    /// - Takes the next step either from a command's follow-up or from the
    ///   event channel.
    async fn drive(&mut self) -> Result<()> {
        let mut step = self.core.initial_cycle();

        loop {
            let mut follow_up = None;
            for command in step.commands {
                if let Some(next) = self.execute_command(command).await? {
                    follow_up = Some(next);
                }
            }

            if !step.keep_running {
                return self.exit_result();
            }

            step = match follow_up {
                Some(next) => next,
                None => {
                    self.start_watching_once()?;
                    match self.next_event().await {
                        Some(event) => {
                            debug!(?event, "runtime received event");
                            self.core.step(event)
                        }
                        None => {
                            info!("runtime event channel closed; exiting");
                            return Ok(());
                        }
                    }
                }
            };
        }
    }

    /// Execute a single command from the core, returning the step that
    /// follows from its outcome.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<Option<CoreStep>> {
        match command {
            CoreCommand::RunBuild { debounce } => Ok(self.run_build(debounce).await),
            CoreCommand::Restart => Ok(Some(self.restart().await)),
            CoreCommand::Shutdown(reason) => {
                self.shutdown(reason).await;
                Ok(None)
            }
        }
    }

    async fn run_build(&mut self, debounce: bool) -> Option<CoreStep> {
        if debounce {
            if let Some(step) = self.debounce().await {
                return Some(step);
            }
        }

        println!("[devloop] Building...");

        let result = match self.build_until_interrupted().await {
            Ok(result) => result,
            Err(step) => return Some(step),
        };

        // Events that queued up while the build finished still belong to
        // this cycle.
        if let Some(step) = self.absorb_queued() {
            return Some(step);
        }

        if result.success {
            info!(duration_ms = result.duration.as_millis() as u64, "build succeeded");
            if let Some(warnings) = &result.diagnostics {
                eprintln!("{warnings}");
            }
            self.staged = result.artifact.clone();
        } else if let Some(err) = result.to_error() {
            error!(duration_ms = result.duration.as_millis() as u64, "build failed");
            eprintln!("{err}");
            if self.server.is_running() {
                println!("[devloop] Build failed; previous server left running.");
            }
        }

        Some(self.core.step(RuntimeEvent::BuildFinished {
            success: result.success,
        }))
    }

    /// Run docs + build while still reading the event channel.
    ///
    /// Changes reach the core (setting the pending flag). If an event ends
    /// the run, the build future is dropped, which kills the toolchain, and
    /// the core's step comes back as `Err`.
    async fn build_until_interrupted(&mut self) -> std::result::Result<BuildResult, CoreStep> {
        let root = self.root.clone();
        let output = self.output.clone();
        let builder = &mut self.builder;
        let work = async move {
            match builder.ensure_docs(&root).await {
                Ok(outcome) => debug!(?outcome, "docs step finished"),
                Err(err) => warn!(error = %err, "docs generation failed; building anyway"),
            }
            builder.build(&root, &output).await
        };
        tokio::pin!(work);

        loop {
            tokio::select! {
                result = &mut work => return Ok(result),
                event = self.event_rx.recv(), if self.events_open => match event {
                    Some(event) => {
                        let step = self.core.step(event);
                        if !step.keep_running {
                            info!("abandoning build");
                            return Err(step);
                        }
                    }
                    None => self.events_open = false,
                },
            }
        }
    }

    /// Wait out the debounce window. Changes inside it belong to the cycle
    /// that is about to build; anything else goes to the core.
    async fn debounce(&mut self) -> Option<CoreStep> {
        if self.debounce.is_zero() {
            return None;
        }

        let deadline = Instant::now() + self.debounce;
        let mut absorbed = 0usize;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                event = self.event_rx.recv(), if self.events_open => match event {
                    Some(RuntimeEvent::SourceChanged(change)) => {
                        absorbed += 1;
                        debug!(path = ?change.path, "change absorbed by debounce");
                    }
                    Some(other) => {
                        let step = self.core.step(other);
                        if !step.keep_running {
                            return Some(step);
                        }
                    }
                    None => self.events_open = false,
                },
            }
        }

        if absorbed > 0 {
            debug!(absorbed, "debounce window closed");
        }
        None
    }

    async fn restart(&mut self) -> CoreStep {
        let pid = match self.replace_server().await {
            Ok(pid) => {
                println!("[devloop] Server started with PID: {pid}");
                Some(pid)
            }
            Err(err) => {
                error!(error = %err, "restart failed; no server running");
                None
            }
        };

        // The channel is not polled during stop/start; whatever arrived
        // meanwhile is folded in while the core is still `Restarting`.
        if let Some(step) = self.absorb_queued() {
            return step;
        }
        self.core.step(RuntimeEvent::RestartFinished { pid })
    }

    /// Feed every already-queued event to the core without waiting.
    ///
    /// Returns the core's step if one of them ends the run.
    fn absorb_queued(&mut self) -> Option<CoreStep> {
        while self.events_open {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    let step = self.core.step(event);
                    if !step.keep_running {
                        return Some(step);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.events_open = false,
            }
        }
        None
    }

    async fn replace_server(&mut self) -> Result<u32> {
        if let Some(old) = self.server.pid() {
            println!("[devloop] Stopping server with PID: {old}");
        }
        self.server.stop().await?;

        let artifact = self.staged.take().ok_or_else(|| {
            DevloopError::LaunchError("no built binary to install".to_string())
        })?;
        self.builder.install(&artifact, &self.output)?;

        self.server.start(&self.output, &self.root).await
    }

    async fn shutdown(&mut self, reason: ShutdownReason) {
        match &reason {
            ShutdownReason::Interrupted => println!("\n[devloop] Cleaning up..."),
            ShutdownReason::WatchFailed(msg) => error!(error = %msg, "file watcher failed"),
        }
        self.release_all().await;
        self.exit_reason = Some(reason);
    }

    /// Stop the server and drop the watch. Safe to call repeatedly.
    async fn release_all(&mut self) {
        if let Some(pid) = self.server.pid() {
            println!("[devloop] Stopping server with PID: {pid}");
        }
        if let Err(err) = self.server.stop().await {
            error!(error = %err, "failed to stop server");
        }
        if let Some(subscription) = self.subscription.take() {
            if let Err(err) = subscription.unsubscribe() {
                warn!(error = %err, "failed to release file watcher");
            }
        }
    }

    fn start_watching_once(&mut self) -> Result<()> {
        if let Some(start) = self.watch_starter.take() {
            self.subscription = Some(start()?);
            println!("[devloop] Watching for changes...");
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<RuntimeEvent> {
        if !self.events_open {
            return None;
        }
        let event = self.event_rx.recv().await;
        if event.is_none() {
            self.events_open = false;
        }
        event
    }

    fn exit_result(&self) -> Result<()> {
        match &self.exit_reason {
            Some(ShutdownReason::WatchFailed(msg)) => Err(DevloopError::WatchError(msg.clone())),
            _ => Ok(()),
        }
    }
}

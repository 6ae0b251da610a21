// src/engine/core.rs

//! Pure controller state machine.
//!
//! `ControllerCore` has no channels, no Tokio types and performs no IO, so
//! the coalescing rules can be unit tested directly.
//!
//! Changes that arrive while a cycle is in flight collapse into a single
//! pending flag; when the cycle ends (successfully or not) exactly one more
//! cycle runs if the flag is set.

use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, ShutdownReason};
use crate::types::ControllerState;

/// Command produced by the core, to be executed by the runtime shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run docs + build. `debounce` asks the shell to wait out the debounce
    /// window first.
    RunBuild { debounce: bool },
    /// Stop the current server, install the new binary, start it.
    Restart,
    /// Stop the server, release the watcher, exit.
    Shutdown(ShutdownReason),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn none() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn one(command: CoreCommand) -> Self {
        Self {
            commands: vec![command],
            keep_running: true,
        }
    }

    fn exit(reason: ShutdownReason) -> Self {
        Self {
            commands: vec![CoreCommand::Shutdown(reason)],
            keep_running: false,
        }
    }
}

#[derive(Debug)]
pub struct ControllerCore {
    state: ControllerState,
    pending_rebuild: bool,
    cycles_started: u64,
}

impl Default for ControllerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerCore {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            pending_rebuild: false,
            cycles_started: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn pending_rebuild(&self) -> bool {
        self.pending_rebuild
    }

    /// Number of build cycles started so far, the initial one included.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    /// Kick off the build-and-launch cycle that runs before watching starts.
    pub fn initial_cycle(&mut self) -> CoreStep {
        if self.state != ControllerState::Idle {
            return CoreStep::none();
        }
        self.begin_cycle(false)
    }

    /// Handle a single runtime event, updating state and returning the
    /// commands for the shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.state == ControllerState::ShuttingDown {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            RuntimeEvent::ShutdownRequested => {
                info!(from = ?self.state, "shutdown requested");
                self.state = ControllerState::ShuttingDown;
                CoreStep::exit(ShutdownReason::Interrupted)
            }
            RuntimeEvent::WatchFailed(msg) => {
                self.state = ControllerState::ShuttingDown;
                CoreStep::exit(ShutdownReason::WatchFailed(msg))
            }
            RuntimeEvent::SourceChanged(change) => self.on_change(change.path.as_path()),
            RuntimeEvent::BuildFinished { success } => self.on_build_finished(success),
            RuntimeEvent::RestartFinished { pid } => self.on_restart_finished(pid),
        }
    }

    fn on_change(&mut self, path: &std::path::Path) -> CoreStep {
        match self.state {
            ControllerState::Idle => {
                info!(?path, "change detected; scheduling rebuild");
                self.begin_cycle(true)
            }
            ControllerState::Building | ControllerState::Restarting => {
                if !self.pending_rebuild {
                    debug!(?path, state = ?self.state, "change during cycle; rebuild pending");
                }
                self.pending_rebuild = true;
                CoreStep::none()
            }
            ControllerState::ShuttingDown => CoreStep::none(),
        }
    }

    fn on_build_finished(&mut self, success: bool) -> CoreStep {
        if self.state != ControllerState::Building {
            warn!(state = ?self.state, "build result outside of Building; ignoring");
            return CoreStep::none();
        }
        if success {
            self.state = ControllerState::Restarting;
            CoreStep::one(CoreCommand::Restart)
        } else {
            self.finish_cycle()
        }
    }

    fn on_restart_finished(&mut self, pid: Option<u32>) -> CoreStep {
        if self.state != ControllerState::Restarting {
            warn!(state = ?self.state, "restart result outside of Restarting; ignoring");
            return CoreStep::none();
        }
        debug!(?pid, "restart finished");
        self.finish_cycle()
    }

    fn begin_cycle(&mut self, debounce: bool) -> CoreStep {
        self.state = ControllerState::Building;
        self.cycles_started += 1;
        CoreStep::one(CoreCommand::RunBuild { debounce })
    }

    fn finish_cycle(&mut self) -> CoreStep {
        if self.pending_rebuild {
            self.pending_rebuild = false;
            debug!("starting pending rebuild");
            self.begin_cycle(true)
        } else {
            self.state = ControllerState::Idle;
            CoreStep::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChangeEvent;

    fn change(path: &str) -> RuntimeEvent {
        RuntimeEvent::SourceChanged(ChangeEvent::new(path))
    }

    fn idle_core() -> ControllerCore {
        let mut core = ControllerCore::new();
        core.initial_cycle();
        core.step(RuntimeEvent::BuildFinished { success: true });
        core.step(RuntimeEvent::RestartFinished { pid: Some(1) });
        assert_eq!(core.state(), ControllerState::Idle);
        core
    }

    #[test]
    fn initial_cycle_builds_without_debounce() {
        let mut core = ControllerCore::new();
        let step = core.initial_cycle();
        assert_eq!(step.commands, vec![CoreCommand::RunBuild { debounce: false }]);
        assert_eq!(core.state(), ControllerState::Building);
        assert!(core.initial_cycle().commands.is_empty());
    }

    #[test]
    fn change_while_idle_runs_full_cycle() {
        let mut core = idle_core();

        let step = core.step(change("/proj/main.go"));
        assert_eq!(step.commands, vec![CoreCommand::RunBuild { debounce: true }]);
        assert_eq!(core.state(), ControllerState::Building);

        let step = core.step(RuntimeEvent::BuildFinished { success: true });
        assert_eq!(step.commands, vec![CoreCommand::Restart]);
        assert_eq!(core.state(), ControllerState::Restarting);

        let step = core.step(RuntimeEvent::RestartFinished { pid: Some(2) });
        assert!(step.commands.is_empty());
        assert_eq!(core.state(), ControllerState::Idle);
        assert_eq!(core.cycles_started(), 2);
    }

    #[test]
    fn failed_build_returns_to_idle_without_restart() {
        let mut core = idle_core();
        core.step(change("/proj/main.go"));

        let step = core.step(RuntimeEvent::BuildFinished { success: false });
        assert!(step.commands.is_empty());
        assert!(step.keep_running);
        assert_eq!(core.state(), ControllerState::Idle);
    }

    #[test]
    fn changes_during_cycle_coalesce_into_one_rebuild() {
        let mut core = idle_core();
        core.step(change("/proj/a.go"));
        for _ in 0..10 {
            assert!(core.step(change("/proj/b.go")).commands.is_empty());
        }
        assert!(core.pending_rebuild());

        core.step(RuntimeEvent::BuildFinished { success: true });
        core.step(change("/proj/c.go"));
        let step = core.step(RuntimeEvent::RestartFinished { pid: Some(3) });
        assert_eq!(step.commands, vec![CoreCommand::RunBuild { debounce: true }]);
        assert!(!core.pending_rebuild());

        core.step(RuntimeEvent::BuildFinished { success: true });
        let step = core.step(RuntimeEvent::RestartFinished { pid: Some(4) });
        assert!(step.commands.is_empty());
        assert_eq!(core.state(), ControllerState::Idle);
        assert_eq!(core.cycles_started(), 3);
    }

    #[test]
    fn pending_rebuild_survives_failed_build() {
        let mut core = idle_core();
        core.step(change("/proj/a.go"));
        core.step(change("/proj/a.go"));

        let step = core.step(RuntimeEvent::BuildFinished { success: false });
        assert_eq!(step.commands, vec![CoreCommand::RunBuild { debounce: true }]);
        assert_eq!(core.state(), ControllerState::Building);
    }

    #[test]
    fn shutdown_is_terminal_from_any_state() {
        let mut core = idle_core();
        core.step(change("/proj/a.go"));

        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert_eq!(
            step.commands,
            vec![CoreCommand::Shutdown(ShutdownReason::Interrupted)]
        );
        assert!(!step.keep_running);
        assert_eq!(core.state(), ControllerState::ShuttingDown);

        let step = core.step(RuntimeEvent::BuildFinished { success: true });
        assert!(step.commands.is_empty());
        assert!(!step.keep_running);
        assert_eq!(core.state(), ControllerState::ShuttingDown);
    }

    #[test]
    fn watch_failure_shuts_down_with_reason() {
        let mut core = idle_core();
        let step = core.step(RuntimeEvent::WatchFailed("inotify limit".into()));
        assert_eq!(
            step.commands,
            vec![CoreCommand::Shutdown(ShutdownReason::WatchFailed(
                "inotify limit".into()
            ))]
        );
        assert!(!step.keep_running);
    }

    #[test]
    fn stray_results_are_ignored() {
        let mut core = idle_core();
        assert!(core.step(RuntimeEvent::BuildFinished { success: true }).commands.is_empty());
        assert!(core.step(RuntimeEvent::RestartFinished { pid: None }).commands.is_empty());
        assert_eq!(core.state(), ControllerState::Idle);
    }
}

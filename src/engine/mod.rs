// src/engine/mod.rs

//! Rebuild controller for devloop.
//!
//! The pure state machine lives in [`core`]: it consumes [`RuntimeEvent`]s
//! and answers with [`CoreCommand`]s. The async shell in [`runtime`] reads
//! the event channel, runs builds and restarts through the backend traits,
//! and feeds the outcomes back into the core.

use std::path::PathBuf;
use std::time::SystemTime;

/// A relevant source file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub at: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            at: SystemTime::now(),
        }
    }
}

/// Events flowing into the controller.
///
/// `SourceChanged`, `ShutdownRequested` and `WatchFailed` arrive over the
/// event channel; `BuildFinished` and `RestartFinished` are fed in by the
/// runtime shell when its own work completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    SourceChanged(ChangeEvent),
    BuildFinished { success: bool },
    /// `pid` is `None` when the new server could not be launched.
    RestartFinished { pid: Option<u32> },
    /// Ctrl-C / SIGTERM.
    ShutdownRequested,
    WatchFailed(String),
}

/// Why the controller is shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupted,
    WatchFailed(String),
}

pub mod core;
pub mod runtime;

pub use core::{ControllerCore, CoreCommand, CoreStep};
pub use crate::types::ControllerState;
pub use runtime::{Runtime, WatchStarter};

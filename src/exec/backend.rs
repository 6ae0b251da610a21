// src/exec/backend.rs

//! Pluggable server backend abstraction.
//!
//! The runtime talks to a `ServerBackend` instead of a concrete
//! [`ProcessSupervisor`]. Production uses the supervisor; tests can swap in a
//! fake that only records starts and stops.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

use super::supervisor::ProcessSupervisor;

/// How the controller starts, stops and inspects the server.
///
/// Implementations must keep at most one server alive, and `stop` must not
/// resolve until the server is gone.
pub trait ServerBackend: Send {
    /// Launch `executable` in `working_dir`, returning its pid.
    fn start<'a>(
        &'a mut self,
        executable: &'a Path,
        working_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u32>> + Send + 'a>>;

    /// Stop the current server, if any. Idempotent.
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Non-blocking liveness check.
    fn is_running(&mut self) -> bool;

    /// Pid of the running server, if there is one.
    fn pid(&mut self) -> Option<u32>;
}

impl ServerBackend for ProcessSupervisor {
    fn start<'a>(
        &'a mut self,
        executable: &'a Path,
        working_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u32>> + Send + 'a>> {
        Box::pin(ProcessSupervisor::start(self, executable, working_dir))
    }

    fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(ProcessSupervisor::stop(self))
    }

    fn is_running(&mut self) -> bool {
        ProcessSupervisor::is_running(self)
    }

    fn pid(&mut self) -> Option<u32> {
        ProcessSupervisor::pid(self)
    }
}

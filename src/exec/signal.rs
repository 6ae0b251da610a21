// src/exec/signal.rs

//! Platform helpers for asking a child process to exit.

use std::io;

use tokio::process::Child;

/// Ask the child to shut down gracefully.
///
/// Unix: `SIGTERM` to the pid. Windows has no equivalent for console
/// children, so this is `TerminateProcess` via `start_kill`.
///
/// Callers must only pass a pid whose child has not been reaped yet, so it
/// cannot have been recycled by the OS.
#[cfg(unix)]
pub fn request_termination(_child: &mut Child, pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Exited between our liveness check and the signal.
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
pub fn request_termination(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.start_kill()
}

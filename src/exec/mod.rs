// src/exec/mod.rs

//! Server process execution layer.
//!
//! - [`supervisor`] owns the single server process: start, stop, status.
//! - [`signal`] holds the platform-specific termination request.
//! - [`backend`] provides the `ServerBackend` trait the runtime drives, which
//!   tests replace with a fake implementation.

pub mod backend;
pub mod signal;
pub mod supervisor;

pub use backend::ServerBackend;
pub use supervisor::{ProcessSupervisor, ServerProcess};

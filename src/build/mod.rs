// src/build/mod.rs

//! Documentation and build toolchain invocation.
//!
//! - [`command`] expands argv templates into `tokio::process::Command`s.
//! - [`builder`] runs the docs generator and the compiler, staging the
//!   binary so a failed build never touches the installed output.
//! - [`backend`] is the trait seam the runtime drives.

pub mod backend;
pub mod builder;
pub mod command;

pub use backend::BuildBackend;
pub use builder::{BuildResult, Builder, DocsOutcome};
pub use command::CommandTemplate;

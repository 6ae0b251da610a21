// src/build/backend.rs

//! Pluggable build backend abstraction.
//!
//! The runtime talks to a `BuildBackend` instead of a concrete [`Builder`],
//! so tests can script build outcomes without a toolchain.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

use super::builder::{BuildResult, Builder, DocsOutcome};

pub trait BuildBackend: Send {
    /// Run the docs step. Errors are reported but never stop a build.
    fn ensure_docs<'a>(
        &'a mut self,
        root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<DocsOutcome>> + Send + 'a>>;

    /// Compile into a staged artifact; `output` must stay untouched.
    fn build<'a>(
        &'a mut self,
        root: &'a Path,
        output: &'a Path,
    ) -> Pin<Box<dyn Future<Output = BuildResult> + Send + 'a>>;

    /// Replace `output` with a staged artifact from a successful build.
    fn install(&mut self, artifact: &Path, output: &Path) -> Result<()>;
}

impl BuildBackend for Builder {
    fn ensure_docs<'a>(
        &'a mut self,
        root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<DocsOutcome>> + Send + 'a>> {
        Box::pin(Builder::ensure_docs(self, root))
    }

    fn build<'a>(
        &'a mut self,
        root: &'a Path,
        output: &'a Path,
    ) -> Pin<Box<dyn Future<Output = BuildResult> + Send + 'a>> {
        Box::pin(Builder::build(self, root, output))
    }

    fn install(&mut self, artifact: &Path, output: &Path) -> Result<()> {
        Builder::install(self, artifact, output)
    }
}

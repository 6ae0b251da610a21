// src/watch/filter.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::Settings;
use crate::types::DocsMode;
use crate::watch::path_utils::{has_suffix, relative_str};

/// Decides which changed paths are relevant source files.
///
/// A path matches when its file name ends in one of the configured suffixes
/// and its root-relative form is not covered by an exclude glob. The build
/// output, its staging file and the generated docs directory never match.
#[derive(Clone)]
pub struct SourceFilter {
    root: PathBuf,
    extensions: Vec<String>,
    exclude: Option<GlobSet>,
    ignored: Vec<PathBuf>,
    ignored_dirs: Vec<PathBuf>,
}

impl fmt::Debug for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFilter")
            .field("root", &self.root)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl SourceFilter {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: &[String],
        exclude: &[String],
    ) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            extensions: extensions.to_vec(),
            exclude: compile_globs(exclude)?,
            ignored: Vec::new(),
            ignored_dirs: Vec::new(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut filter = Self::new(
            settings.root.clone(),
            &settings.watch.extensions,
            &settings.watch.exclude,
        )?;
        filter.ignore(settings.output.clone());
        filter.ignore(settings.staged_output());

        // The docs generator writes sources (e.g. docs/docs.go) on every
        // run; watching them would retrigger builds.
        if settings.docs.mode != DocsMode::Never {
            if let Some(dir) = settings.docs.artifact.parent() {
                if dir != settings.root {
                    filter.ignore_dir(dir.to_path_buf());
                }
            }
        }
        Ok(filter)
    }

    /// Never match this exact path.
    pub fn ignore(&mut self, path: PathBuf) {
        self.ignored.push(path);
    }

    /// Never match anything below `dir`.
    pub fn ignore_dir(&mut self, dir: PathBuf) {
        self.ignored_dirs.push(dir);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|p| p == path)
            || self.ignored_dirs.iter().any(|d| path.starts_with(d))
        {
            return false;
        }
        if !self.extensions.iter().any(|ext| has_suffix(path, ext)) {
            return false;
        }
        if let (Some(exclude), Some(rel)) = (&self.exclude, relative_str(&self.root, path)) {
            if exclude.is_match(&rel) {
                return false;
            }
        }
        true
    }
}

fn compile_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(Some(builder.build().context("building exclude glob set")?))
}

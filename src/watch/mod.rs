// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths are relevant sources (suffix + exclude globs).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally suppressing events for files whose content is unchanged.
//!
//! It does **not** debounce; timing is the controller's business.

pub mod filter;
pub mod hash;
pub mod path_utils;
pub mod watcher;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Settings;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::RealFileSystem;

pub use filter::SourceFilter;
pub use hash::{ContentHashes, compute_file_hash};
pub use watcher::{EventForwarder, Subscription, subscribe};

/// Subscribe to the project root described by `settings`.
pub fn subscribe_from_settings(
    settings: &Settings,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<Subscription> {
    let filter = SourceFilter::from_settings(settings)?;
    let hashes = settings
        .watch
        .use_hash
        .then(|| ContentHashes::new(Arc::new(RealFileSystem)));
    subscribe(filter, hashes, runtime_tx)
}

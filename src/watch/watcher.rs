// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, trace, warn};

use crate::engine::{ChangeEvent, RuntimeEvent};
use crate::errors::Result;
use crate::watch::filter::SourceFilter;
use crate::watch::hash::ContentHashes;

/// Live recursive watch on the project root.
///
/// The OS watch is released by [`Subscription::unsubscribe`] or, on every
/// other exit path, when the subscription is dropped.
pub struct Subscription {
    watcher: Option<RecommendedWatcher>,
    root: PathBuf,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("root", &self.root)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl Subscription {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and release the OS handles.
    pub fn unsubscribe(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.unwatch(&self.root)?;
            info!("file watcher stopped on {:?}", self.root);
        }
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            debug!(error = %err, "unwatch on drop failed");
        }
    }
}

/// Turns raw notify results into controller events.
///
/// Runs on notify's own thread, never inside the Tokio runtime, which is
/// what makes `blocking_send` safe for errors.
pub struct EventForwarder {
    filter: SourceFilter,
    hashes: Option<ContentHashes>,
    tx: mpsc::Sender<RuntimeEvent>,
}

impl EventForwarder {
    pub fn new(
        filter: SourceFilter,
        hashes: Option<ContentHashes>,
        tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self { filter, hashes, tx }
    }

    pub fn handle(&mut self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "file watch error");
                // Errors must reach the controller, so wait for room.
                if self.tx.blocking_send(RuntimeEvent::WatchFailed(err.to_string())).is_err() {
                    debug!("controller gone; dropping watch error");
                }
                return;
            }
        };

        // The backend lost events; which files changed is unknown, so the
        // whole tree counts as changed.
        if event.need_rescan() {
            warn!("file watcher overflowed; treating the project as changed");
            let root = self.filter.root().to_path_buf();
            self.forward(root);
            return;
        }

        if !is_relevant_kind(&event.kind) {
            trace!(kind = ?event.kind, "ignoring event kind");
            return;
        }

        for path in event.paths {
            if !self.filter.matches(&path) {
                trace!(?path, "path filtered out");
                continue;
            }
            if let Some(hashes) = self.hashes.as_mut() {
                if !hashes.changed(&path) {
                    continue;
                }
            }

            debug!(?path, "relevant change");
            if !self.forward(path) {
                return;
            }
        }
    }

    /// Queue a change without blocking. Returns `false` once the controller
    /// is gone.
    fn forward(&self, path: PathBuf) -> bool {
        match self.tx.try_send(RuntimeEvent::SourceChanged(ChangeEvent::new(path))) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // A full queue already holds changes, so a rebuild is owed.
                trace!("event channel full; change coalesced");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Content-changing events only; reads and opaque "other" events are noise.
fn is_relevant_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Name(_))
        | EventKind::Modify(ModifyKind::Metadata(_)) => true,
        EventKind::Modify(ModifyKind::Other) => false,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    }
}

/// Recursively watch `filter.root()` and forward matching changes to
/// `runtime_tx`.
pub fn subscribe(
    filter: SourceFilter,
    hashes: Option<ContentHashes>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<Subscription> {
    let root = filter.root().to_path_buf();
    let mut forwarder = EventForwarder::new(filter, hashes, runtime_tx);

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| forwarder.handle(res),
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    Ok(Subscription {
        watcher: Some(watcher),
        root,
    })
}

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use devloop::engine::{ChangeEvent, Runtime, RuntimeEvent};
use devloop::errors::Result;
use devloop_test_utils::fakes::{FakeBuilder, FakeServer};

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// A runtime on fakes, running in a background task.
pub struct Harness {
    pub tx: mpsc::Sender<RuntimeEvent>,
    pub builder: FakeBuilder,
    pub server: FakeServer,
    pub handle: JoinHandle<Result<()>>,
}

impl Harness {
    pub fn spawn(builder: FakeBuilder, server: FakeServer, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let runtime = Runtime::new(
            rx,
            builder.clone(),
            server.clone(),
            PathBuf::from("/proj"),
            PathBuf::from("/proj/server"),
            debounce,
        );
        let handle = tokio::spawn(runtime.run());
        Self {
            tx,
            builder,
            server,
            handle,
        }
    }

    pub async fn change(&self, path: &str) {
        self.tx
            .send(RuntimeEvent::SourceChanged(ChangeEvent::new(path)))
            .await
            .expect("runtime dropped its receiver");
    }

    pub async fn interrupt(&self) {
        self.tx
            .send(RuntimeEvent::ShutdownRequested)
            .await
            .expect("runtime dropped its receiver");
    }

    /// Wait for the runtime task to end and return its result.
    pub async fn finish(self) -> Result<()> {
        devloop_test_utils::with_timeout(self.handle)
            .await
            .expect("runtime task panicked")
    }
}

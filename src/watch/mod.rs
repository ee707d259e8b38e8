//! Watch Loop
//!
//! Background thread turning filesystem notifications into reload work.
//!
//! Architecture:
//! ```text
//! notify watcher → crossbeam channel → Batcher (debounce, dedup) → ReloadEngine
//! ```
//!
//! Batches are handled synchronously on the watch thread, so the shutdown
//! signal is only observed between batches.

mod batch;
mod types;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::reload::ReloadEngine;
use crate::{debug, log};
use batch::Batcher;

pub use types::{ChangeEvent, ChangeKind};

const THREAD_NAME: &str = "reframe-watch";

/// Default quiet window closing a batch
pub const DEBOUNCE_MS: u64 = 50;

/// Handle to the running watch thread.
pub struct WatchLoop {
    shutdown_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl WatchLoop {
    /// Start watching `root` recursively and feed batches to `engine`.
    ///
    /// The watcher is attached before this returns, so changes made after
    /// the call are never missed.
    pub fn spawn(root: &Path, debounce: Duration, engine: ReloadEngine) -> Result<Self> {
        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;

        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let root = root.to_path_buf();
        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run(watcher, root, event_rx, shutdown_rx, debounce, engine))
            .context("failed to spawn watch thread")?;

        Ok(Self {
            shutdown_tx,
            thread,
        })
    }

    /// Signal the loop and wait for it to finish its current batch.
    pub fn stop(self) {
        let _ = self.shutdown_tx.try_send(());
        if self.thread.join().is_err() {
            log!("watch"; "watch thread panicked");
        }
    }
}

fn run(
    // Dropping the watcher stops notifications
    _watcher: RecommendedWatcher,
    root: PathBuf,
    event_rx: Receiver<notify::Result<notify::Event>>,
    shutdown_rx: Receiver<()>,
    debounce: Duration,
    mut engine: ReloadEngine,
) {
    log!("watch"; "watching {}", root.display());
    let mut batcher = Batcher::new(debounce);

    loop {
        crossbeam::select! {
            recv(shutdown_rx) -> _ => break,
            recv(event_rx) -> msg => match msg {
                Ok(Ok(event)) => batcher.add_event(&event),
                Ok(Err(e)) => log!("watch"; "notify error: {}", e),
                Err(_) => break,
            },
            default(batcher.sleep_duration()) => {
                if let Some(batch) = batcher.take_if_ready() {
                    let outcomes = engine.process_batch(&batch);
                    debug!("watch"; "batch of {}: {:?}", batch.len(), outcomes);
                }
            }
        }
    }

    debug!("watch"; "stopped");
}

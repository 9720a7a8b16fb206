//! # Debounced Snapshot Writer
//!
//! Mutations hand the latest snapshot to a [`SnapshotWriter`]; a background
//! task writes it once edits have settled for the quiet period. A newer
//! snapshot replaces a pending one, so only the last state of a burst is
//! written.
//!
//! Save failures are logged and dropped. The in-memory session stays
//! authoritative and the next edit schedules another save.

use invigil_core::{Snapshot, SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle used by request handlers to schedule a save.
#[derive(Clone)]
pub struct SnapshotWriter {
    tx: Arc<watch::Sender<Option<Snapshot>>>,
}

impl SnapshotWriter {
    /// Replace the pending snapshot and restart the quiet period.
    pub fn schedule(&self, snapshot: Snapshot) {
        self.tx.send_replace(Some(snapshot));
    }
}

/// The running background task.
pub struct WriterTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl WriterTask {
    /// Write any pending snapshot now and wait for the task to exit.
    pub async fn finish(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "snapshot writer task failed");
        }
    }
}

/// Start the writer for `owner_key` on the current tokio runtime.
pub fn spawn(
    store: Arc<dyn SnapshotStore>,
    owner_key: impl Into<String>,
    quiet_period: Duration,
) -> (SnapshotWriter, WriterTask) {
    let (tx, rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = Worker {
        store,
        owner_key: owner_key.into(),
        quiet_period,
        rx,
        stop: stop_rx,
    };
    let handle = tokio::spawn(worker.run());
    (
        SnapshotWriter { tx: Arc::new(tx) },
        WriterTask {
            handle,
            stop: stop_tx,
        },
    )
}

struct Worker {
    store: Arc<dyn SnapshotStore>,
    owner_key: String,
    quiet_period: Duration,
    rx: watch::Receiver<Option<Snapshot>>,
    stop: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        let mut stopping = false;
        while !stopping {
            let dirty = tokio::select! {
                biased;
                changed = self.rx.changed() => changed.is_ok(),
                _ = self.stop.changed() => {
                    stopping = true;
                    self.rx.has_changed().unwrap_or(false)
                }
            };
            if !dirty {
                // Either stopping with nothing pending or every writer dropped.
                break;
            }

            if !stopping {
                loop {
                    tokio::select! {
                        biased;
                        _ = self.stop.changed() => {
                            stopping = true;
                            break;
                        }
                        changed = self.rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        () = tokio::time::sleep(self.quiet_period) => break,
                    }
                }
            }

            let pending = self.rx.borrow_and_update().clone();
            if let Some(snapshot) = pending {
                self.save(snapshot).await;
            }
        }
        tracing::debug!(owner = %self.owner_key, "snapshot writer stopped");
    }

    async fn save(&self, snapshot: Snapshot) {
        let store = Arc::clone(&self.store);
        let owner = self.owner_key.clone();
        let exams = snapshot.exams.len();
        let teachers = snapshot.teachers.len();

        match tokio::task::spawn_blocking(move || store.save(&owner, &snapshot)).await {
            Ok(Ok(())) => {
                tracing::info!(owner = %self.owner_key, exams, teachers, "snapshot saved");
            }
            Ok(Err(e)) => {
                tracing::error!(owner = %self.owner_key, error = %e, "snapshot save failed");
            }
            Err(e) => {
                tracing::error!(owner = %self.owner_key, error = %e, "snapshot save panicked");
            }
        }
    }
}

//! Fire-and-forget queue feeding the remote mirror.
//!
//! Store mutations enqueue records through a [`SyncHandle`] and return
//! immediately. A single [`SyncWorker`] task drains the queue in order,
//! retrying each record a bounded number of times. Failures are logged and
//! dropped; they never reach the caller that produced the record.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::sync::mirror::RemoteMirror;
use crate::sync::record::SyncRecord;

/// Sending side of the sync queue.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncRecord>,
}

impl SyncHandle {
    /// Create a handle and the matching receiver.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a record for delivery. Never blocks.
    pub fn enqueue(&self, record: SyncRecord) {
        if self.tx.send(record).is_err() {
            debug!("Sync worker stopped; record dropped");
        }
    }
}

/// Background task that pushes queued records to a [`RemoteMirror`].
pub struct SyncWorker {
    mirror: Arc<dyn RemoteMirror>,
    rx: mpsc::UnboundedReceiver<SyncRecord>,
    max_attempts: u32,
    retry_delay: Duration,
    shutdown: Arc<Notify>,
}

impl SyncWorker {
    /// Create a worker and the handle used to feed it.
    #[must_use]
    pub fn new(mirror: Arc<dyn RemoteMirror>, config: &SyncConfig) -> (Self, SyncHandle) {
        let (handle, rx) = SyncHandle::channel();
        let worker = Self {
            mirror,
            rx,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            shutdown: Arc::new(Notify::new()),
        };
        (worker, handle)
    }

    /// Notifier that stops the worker after draining queued records.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the worker as a tokio task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        info!(max_attempts = self.max_attempts, "Starting sync worker");

        loop {
            tokio::select! {
                received = self.rx.recv() => {
                    let Some(record) = received else {
                        break;
                    };
                    self.deliver(&record).await;
                }
                () = self.shutdown.notified() => {
                    self.rx.close();
                    while let Some(record) = self.rx.recv().await {
                        self.deliver(&record).await;
                    }
                    break;
                }
            }
        }

        info!("Sync worker shutting down");
    }

    /// Push one record, retrying with a linear backoff.
    ///
    /// Returns whether the record was delivered.
    pub async fn deliver(&self, record: &SyncRecord) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.mirror.push(record).await {
                Ok(()) => {
                    debug!(table = record.table(), attempt, "Record mirrored");
                    return true;
                }
                Err(err) if attempt < self.max_attempts => {
                    debug!(table = record.table(), attempt, %err, "Mirror push failed, retrying");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(err) => {
                    warn!(table = record.table(), attempts = attempt, %err, "Giving up on record");
                }
            }
        }
        false
    }
}

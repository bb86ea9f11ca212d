//! Per-instance save queue.
//!
//! The session hands complete snapshots to a [`SaveQueue`] without blocking.
//! One writer task per instance drains the queue and applies saves to the
//! store strictly in issuance order. Failed writes are logged and dropped;
//! the in-memory state stays authoritative and the next save supersedes them.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{StateStore, StorageError};

/// A full snapshot to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub instance_id: u32,
    pub data: String,
    pub completed_mask: u32,
}

/// Sending half of an instance's save queue.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl SaveQueue {
    /// Create a queue and its receiving end (for a custom writer or for tests).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SaveRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn submit(&self, request: SaveRequest) -> Result<(), StorageError> {
        let instance_id = request.instance_id;
        self.tx
            .send(request)
            .map_err(|_| StorageError::QueueClosed { instance_id })
    }
}

/// Outcome of a writer task that ran until its queue closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: usize,
    pub failed: usize,
}

/// Spawn a writer task on the current tokio runtime.
///
/// The task ends once every [`SaveQueue`] clone has been dropped.
pub fn spawn_writer(store: Arc<dyn StateStore>) -> (SaveQueue, JoinHandle<WriterStats>) {
    let (queue, rx) = SaveQueue::channel();
    let handle = tokio::spawn(run_writer(store, rx));
    (queue, handle)
}

/// Apply queued saves in order until the queue closes.
pub async fn run_writer(
    store: Arc<dyn StateStore>,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
) -> WriterStats {
    let mut stats = WriterStats::default();

    while let Some(request) = rx.recv().await {
        match store.put(request.instance_id, &request.data, request.completed_mask) {
            Ok(()) => {
                stats.written += 1;
                tracing::debug!(instance = request.instance_id, "Instance state saved");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(
                    instance = request.instance_id,
                    error = %e,
                    "Failed to save instance state"
                );
            }
        }
    }

    stats
}

//! Best-effort audit trail. Entries go through a channel to a background
//! task, so a slow or failing sink never touches the business operation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::domain::audit::AuditEntry;
use crate::domain::ports::AuditStore;

/// Entries allowed to wait for the writer before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: Option<mpsc::Sender<AuditEntry>>,
}

impl AuditRecorder {
    /// Starts the writer task on the current tokio runtime. The task ends
    /// once every recorder clone has been dropped and the queue is drained.
    pub fn spawn(store: Arc<dyn AuditStore>) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(store, DEFAULT_QUEUE_CAPACITY)
    }

    /// Like [`AuditRecorder::spawn`] with at most `capacity` queued entries.
    pub fn spawn_with_capacity(
        store: Arc<dyn AuditStore>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(write_entries(rx, store));
        (Self { tx: Some(tx) }, handle)
    }

    /// A recorder that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Fire-and-forget. Never waits: a full queue drops the entry.
    pub fn record(&self, entry: AuditEntry) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => log::warn!(
                "Audit queue is full; dropping {} on {} {:?}",
                entry.action,
                entry.table_name,
                entry.record_id
            ),
            Err(TrySendError::Closed(entry)) => log::warn!(
                "Audit writer has stopped; dropping {} on {} {:?}",
                entry.action,
                entry.table_name,
                entry.record_id
            ),
        }
    }
}

async fn write_entries(mut rx: mpsc::Receiver<AuditEntry>, store: Arc<dyn AuditStore>) {
    while let Some(entry) = rx.recv().await {
        let store = Arc::clone(&store);
        let action = entry.action.clone();
        let record_id = entry.record_id;
        match tokio::task::spawn_blocking(move || store.append(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("{} ({} on record {:?})", e, action, record_id),
            Err(e) => log::error!("Audit write task failed: {}", e),
        }
    }
}

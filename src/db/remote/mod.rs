use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::models::{Identity, Watchlist, WatchlistEntry};

pub mod memory;
pub mod redis_store;

pub use self::memory::MemoryDocumentStore;
pub use self::redis_store::{create_redis_client, RedisDocumentStore};

/// Per-identity watchlist document as stored remotely
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistDocument {
    pub items: Watchlist,
    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Remote per-identity document store with change notifications
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, identity: &Identity) -> AppResult<bool>;

    /// Current collection, empty when no document exists
    async fn read(&self, identity: &Identity) -> AppResult<Watchlist>;

    /// Overwrites the whole document and notifies subscribers
    async fn write(&self, identity: &Identity, entries: &[WatchlistEntry]) -> AppResult<()>;

    /// Listens for document changes
    ///
    /// The current collection is delivered first, then every later write.
    async fn subscribe(&self, identity: &Identity) -> AppResult<Subscription>;
}

/// Stream of whole-collection snapshots for one identity
///
/// Dropping the subscription stops the listener.
pub struct Subscription {
    updates: mpsc::UnboundedReceiver<Watchlist>,
    listener: JoinHandle<()>,
}

impl Subscription {
    pub fn new(updates: mpsc::UnboundedReceiver<Watchlist>, listener: JoinHandle<()>) -> Self {
        Self { updates, listener }
    }

    /// Next snapshot, `None` once the listener has stopped
    pub async fn next(&mut self) -> Option<Watchlist> {
        self.updates.recv().await
    }

    /// Stops listening; same as dropping the subscription
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Outcome of background remote writes, surfaced to clients as a sync badge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub pending_writes: usize,
    pub failed_writes: u64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct SyncTracker {
    pending: AtomicUsize,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SyncTracker {
    fn enqueued(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn completed(&self, result: &AppResult<()>) {
        let mut last_error = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match result {
            Ok(()) => *last_error = None,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                *last_error = Some(e.to_string());
            }
        }
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            pending_writes: self.pending.load(Ordering::SeqCst),
            failed_writes: self.failed.load(Ordering::SeqCst),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}

/// Message for the background writer
enum WriterMessage {
    Write {
        identity: Identity,
        entries: Vec<WatchlistEntry>,
    },
    /// Acknowledged once every earlier write has been attempted
    Flush(oneshot::Sender<()>),
}

/// Remote watchlist store with fire-and-forget writes
///
/// Writes are queued to a single background task and applied in the
/// order they were issued. A failed write is logged and counted in
/// [`SyncStatus`]; it is not retried.
#[derive(Clone)]
pub struct RemoteStore {
    documents: Arc<dyn DocumentStore>,
    write_tx: mpsc::UnboundedSender<WriterMessage>,
    tracker: Arc<SyncTracker>,
}

/// Handle for gracefully shutting down the remote writer
///
/// Dropping the handle also stops the writer.
pub struct RemoteWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RemoteWriterHandle {
    /// Signals the writer to stop and waits until queued writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Remote writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Remote writer task panicked");
        }
    }
}

impl RemoteStore {
    /// Creates a new RemoteStore and spawns its background writer
    pub async fn new(documents: Arc<dyn DocumentStore>) -> (Self, RemoteWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let tracker = Arc::new(SyncTracker::default());

        let task = tokio::spawn(Self::writer_task(
            documents.clone(),
            tracker.clone(),
            write_rx,
            shutdown_rx,
        ));

        let store = Self {
            documents,
            write_tx,
            tracker,
        };

        (store, RemoteWriterHandle { shutdown_tx, task })
    }

    /// Background task that applies queued writes in order
    ///
    /// On shutdown, drains whatever is already queued before exiting.
    async fn writer_task(
        documents: Arc<dyn DocumentStore>,
        tracker: Arc<SyncTracker>,
        mut write_rx: mpsc::UnboundedReceiver<WriterMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Remote writer task started");

        loop {
            tokio::select! {
                biased;
                Some(msg) = write_rx.recv() => {
                    Self::handle(documents.as_ref(), &tracker, msg).await;
                }
                _ = shutdown_rx.recv() => {
                    let pending = tracker.snapshot().pending_writes;
                    tracing::info!(pending = pending, "Remote writer shutting down, flushing remaining writes");

                    while let Ok(msg) = write_rx.try_recv() {
                        Self::handle(documents.as_ref(), &tracker, msg).await;
                    }

                    tracing::info!("Remote writer task stopped");
                    break;
                }
            }
        }
    }

    async fn handle(documents: &dyn DocumentStore, tracker: &SyncTracker, msg: WriterMessage) {
        match msg {
            WriterMessage::Write { identity, entries } => {
                let result = documents.write(&identity, &entries).await;
                match &result {
                    Ok(()) => tracing::debug!(
                        identity = %identity,
                        entries = entries.len(),
                        "Remote watchlist written"
                    ),
                    Err(e) => tracing::error!(
                        identity = %identity,
                        error = %e,
                        "Failed to write remote watchlist"
                    ),
                }
                tracker.completed(&result);
            }
            WriterMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    pub async fn exists(&self, identity: &Identity) -> AppResult<bool> {
        self.documents.exists(identity).await
    }

    pub async fn read(&self, identity: &Identity) -> AppResult<Watchlist> {
        self.documents.read(identity).await
    }

    /// Writes immediately and reports the result, bypassing the queue
    pub async fn write_now(&self, identity: &Identity, entries: &[WatchlistEntry]) -> AppResult<()> {
        self.documents.write(identity, entries).await
    }

    pub async fn subscribe(&self, identity: &Identity) -> AppResult<Subscription> {
        self.documents.subscribe(identity).await
    }

    /// Queues a full-collection write without waiting for it
    pub fn write_in_background(&self, identity: &Identity, entries: Vec<WatchlistEntry>) {
        self.tracker.enqueued();
        let msg = WriterMessage::Write {
            identity: identity.clone(),
            entries,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to queue remote watchlist write");
            self.tracker.completed(&Err(crate::error::AppError::Internal(
                "remote writer is not running".to_string(),
            )));
        }
    }

    /// Waits until every write queued so far has been attempted
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.write_tx.send(WriterMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// True while any queued write has not been attempted yet
    pub fn has_pending_writes(&self) -> bool {
        self.tracker.pending.load(Ordering::SeqCst) > 0
    }

    pub fn status(&self) -> SyncStatus {
        self.tracker.snapshot()
    }
}

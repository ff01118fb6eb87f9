use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::db::remote::{DocumentStore, Subscription, WatchlistDocument};
use crate::error::AppResult;
use crate::models::{Identity, Watchlist, WatchlistEntry};

const CHANGE_BUFFER: usize = 64;

/// Process-local document store
///
/// Used when no Redis URL is configured. Account watchlists are lost on
/// restart but behave like the remote store otherwise, change
/// notifications included.
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<Identity, WatchlistDocument>>,
    changes: broadcast::Sender<(Identity, Watchlist)>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            documents: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn exists(&self, identity: &Identity) -> AppResult<bool> {
        Ok(self.documents.read().await.contains_key(identity))
    }

    async fn read(&self, identity: &Identity) -> AppResult<Watchlist> {
        Ok(self
            .documents
            .read()
            .await
            .get(identity)
            .map(|document| document.items.clone())
            .unwrap_or_default())
    }

    async fn write(&self, identity: &Identity, entries: &[WatchlistEntry]) -> AppResult<()> {
        let items = Watchlist::from_entries(entries.to_vec());
        self.documents.write().await.insert(
            identity.clone(),
            WatchlistDocument {
                items: items.clone(),
                updated_at: Utc::now(),
            },
        );
        // No receivers is fine
        let _ = self.changes.send((identity.clone(), items));
        Ok(())
    }

    async fn subscribe(&self, identity: &Identity) -> AppResult<Subscription> {
        let mut changes = self.changes.subscribe();
        let current = self.read(identity).await?;

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let _ = updates_tx.send(current);

        let identity = identity.clone();
        let listener = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok((changed, items)) if changed == identity => {
                        if updates_tx.send(items).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(identity = %identity, skipped = skipped, "Watchlist subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(updates_rx, listener))
    }
}

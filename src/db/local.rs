use std::sync::Arc;

use crate::db::DeviceStorage;
use crate::models::{Watchlist, WatchlistEntry};

/// Storage key of the guest watchlist
pub const STORAGE_KEY: &str = "my_watchlist_v1";

/// Guest watchlist kept in on-device storage
///
/// Best-effort: read failures degrade to an empty watchlist and write
/// failures are only logged.
///
/// Writes are synchronous file writes of one small JSON document and run
/// on the calling task, under the reconciler's state lock. That keeps
/// device writes in call order.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn DeviceStorage>,
}

impl LocalStore {
    pub fn new(storage: Arc<dyn DeviceStorage>) -> Self {
        Self { storage }
    }

    pub fn read(&self) -> Watchlist {
        let stored = match self.storage.get(STORAGE_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Watchlist::new(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load watchlist from device storage");
                return Watchlist::new();
            }
        };

        serde_json::from_str(&stored).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Stored watchlist is not valid JSON");
            Watchlist::new()
        })
    }

    pub fn write(&self, entries: &[WatchlistEntry]) {
        let json = match serde_json::to_string(entries) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Watchlist serialization error");
                return;
            }
        };

        if let Err(e) = self.storage.set(STORAGE_KEY, &json) {
            tracing::error!(error = %e, "Failed to save watchlist to device storage");
        } else {
            tracing::debug!(entries = entries.len(), "Watchlist saved to device storage");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(STORAGE_KEY) {
            tracing::error!(error = %e, "Failed to clear device watchlist");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileStorage;
    use crate::models::{timestamp_now, EntryDraft, MediaKind, WatchStatus};

    fn store_in(dir: &std::path::Path) -> LocalStore {
        LocalStore::new(Arc::new(FileStorage::new(dir)))
    }

    #[test]
    fn test_write_then_read_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = Watchlist::new();
        list.add(
            EntryDraft {
                id: 27205,
                title: "Inception".to_string(),
                media_kind: MediaKind::Movie,
                poster_path: None,
                year: Some("2010".to_string()),
            },
            WatchStatus::PlanToWatch,
            timestamp_now(),
        );

        store_in(dir.path()).write(list.entries());

        // A fresh store over the same directory sees the saved entry
        let reloaded = store_in(dir.path()).read();
        assert_eq!(reloaded, list);
    }

    #[test]
    fn test_corrupt_data_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set(STORAGE_KEY, "{not json").unwrap();

        let store = LocalStore::new(Arc::new(storage));
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_clear_removes_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.write(&[]);
        store.clear();
        assert!(store.read().is_empty());
        assert!(!dir.path().join("my_watchlist_v1.json").exists());
    }
}

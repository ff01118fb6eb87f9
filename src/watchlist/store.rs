use crate::db::{LocalStore, RemoteStore};
use crate::error::AppResult;
use crate::models::{Identity, Watchlist, WatchlistEntry};

/// Where the authoritative watchlist currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    Guest,
    Account,
}

/// Backing store strategy used by the reconciler
///
/// `persist` hands over the full collection and never reports failure to
/// the caller.
#[async_trait::async_trait]
pub trait WatchlistStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    async fn load(&self) -> AppResult<Watchlist>;

    fn persist(&self, entries: &[WatchlistEntry]);
}

#[async_trait::async_trait]
impl WatchlistStore for LocalStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Guest
    }

    async fn load(&self) -> AppResult<Watchlist> {
        Ok(self.read())
    }

    fn persist(&self, entries: &[WatchlistEntry]) {
        self.write(entries);
    }
}

/// Remote store bound to the signed-in identity
#[derive(Clone)]
pub struct AccountStore {
    remote: RemoteStore,
    identity: Identity,
}

impl AccountStore {
    pub fn new(remote: RemoteStore, identity: Identity) -> Self {
        Self { remote, identity }
    }
}

#[async_trait::async_trait]
impl WatchlistStore for AccountStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Account
    }

    async fn load(&self) -> AppResult<Watchlist> {
        self.remote.read(&self.identity).await
    }

    fn persist(&self, entries: &[WatchlistEntry]) {
        self.remote
            .write_in_background(&self.identity, entries.to_vec());
    }
}

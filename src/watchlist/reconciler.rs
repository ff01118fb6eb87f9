use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::db::{LocalStore, RemoteStore, Subscription, SyncStatus};
use crate::models::{
    timestamp_now, EntryDraft, EntryId, Identity, Rating, WatchStatus, Watchlist, WatchlistEntry,
};
use crate::watchlist::migration::{migrate_guest_entries, MigrationOutcome};
use crate::watchlist::session::{AuthSession, AuthState};
use crate::watchlist::store::{AccountStore, StoreMode, WatchlistStore};

/// Lifecycle of the reconciler within a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Identity not resolved yet; the device watchlist is shown and written
    Uninitialized,
    Guest,
    /// Signed in, guest entries being moved to the account
    Migrating(Identity),
    /// Signed in, remote document authoritative and live
    Synced(Identity),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Guest => "guest",
            Phase::Migrating(_) => "migrating",
            Phase::Synced(_) => "synced",
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Phase::Migrating(identity) | Phase::Synced(identity) => Some(identity),
            Phase::Uninitialized | Phase::Guest => None,
        }
    }
}

/// Read-only view handed to the HTTP layer
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistView {
    pub mode: StoreMode,
    pub phase: &'static str,
    pub identity: Option<Identity>,
    pub items: Vec<WatchlistEntry>,
}

struct State {
    phase: Phase,
    watchlist: Watchlist,
    store: Arc<dyn WatchlistStore>,
    push_listener: Option<JoinHandle<()>>,
}

impl State {
    fn stop_push_listener(&mut self) {
        if let Some(listener) = self.push_listener.take() {
            listener.abort();
        }
    }
}

struct Inner {
    local: LocalStore,
    remote: RemoteStore,
    state: RwLock<State>,
}

/// Single watchlist surface over device and account storage
///
/// Mutations update the in-memory watchlist before returning and then
/// hand the whole collection to the active store without waiting for the
/// write. Sign-in and sign-out swap the active store; the first sign-in
/// of an identity without an account watchlist moves the guest entries
/// over.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

/// Keeps the reconciler following an [`AuthSession`]
pub struct SessionHandle {
    listener: JoinHandle<()>,
    reconciler: Reconciler,
}

impl SessionHandle {
    /// Stops following the session and drops the live subscription
    pub async fn shutdown(self) {
        self.listener.abort();
        self.reconciler.inner.state.write().await.stop_push_listener();
        tracing::info!("Watchlist session closed");
    }
}

impl Reconciler {
    /// Creates a reconciler showing the device watchlist until identity resolves
    pub fn new(local: LocalStore, remote: RemoteStore) -> Self {
        let state = State {
            phase: Phase::Uninitialized,
            watchlist: local.read(),
            store: Arc::new(local.clone()),
            push_listener: None,
        };

        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                state: RwLock::new(state),
            }),
        }
    }

    /// Follows identity changes of `session` until the handle is shut down
    pub fn attach(&self, session: &AuthSession) -> SessionHandle {
        let mut auth_rx = session.watch();
        let reconciler = self.clone();

        let listener = tokio::spawn(async move {
            loop {
                let auth = auth_rx.borrow_and_update().clone();
                reconciler.apply_auth(auth).await;
                if auth_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        SessionHandle {
            listener,
            reconciler: self.clone(),
        }
    }

    /// Moves to the phase matching an authentication state
    pub async fn apply_auth(&self, auth: AuthState) {
        match auth {
            AuthState::Resolving => {}
            AuthState::SignedOut => self.enter_guest().await,
            AuthState::SignedIn(identity) => self.enter_account(identity).await,
        }
    }

    async fn enter_guest(&self) {
        let mut state = self.inner.state.write().await;
        if state.phase == Phase::Guest {
            return;
        }

        state.stop_push_listener();
        state.watchlist = self.inner.local.read();
        state.store = Arc::new(self.inner.local.clone());
        state.phase = Phase::Guest;

        tracing::info!(entries = state.watchlist.len(), "Watchlist using device storage");
    }

    /// Holds the state lock for the whole transition so mutations issued
    /// meanwhile land on the account watchlist
    ///
    /// If the account watchlist cannot be read the reconciler falls back to
    /// device storage, so nothing local is ever written over the account
    /// document. Signing in again retries.
    async fn enter_account(&self, identity: Identity) {
        let mut state = self.inner.state.write().await;
        if state.phase == Phase::Synced(identity.clone()) {
            return;
        }

        state.stop_push_listener();
        state.phase = Phase::Migrating(identity.clone());

        let outcome = migrate_guest_entries(&self.inner.local, &self.inner.remote, &identity).await;
        tracing::debug!(identity = %identity, outcome = ?outcome, "Guest migration finished");

        let account = AccountStore::new(self.inner.remote.clone(), identity.clone());
        match account.load().await {
            Ok(watchlist) => state.watchlist = watchlist,
            Err(e) => {
                tracing::error!(
                    identity = %identity,
                    error = %e,
                    "Failed to load account watchlist, staying on device storage"
                );
                state.watchlist = self.inner.local.read();
                state.store = Arc::new(self.inner.local.clone());
                state.phase = Phase::Guest;
                return;
            }
        }
        state.store = Arc::new(account);
        state.phase = Phase::Synced(identity.clone());

        match self.inner.remote.subscribe(&identity).await {
            Ok(mut subscription) => {
                // First message is the current document
                if let Some(current) = subscription.next().await {
                    state.watchlist = current;
                }
                state.push_listener = Some(self.spawn_push_listener(identity.clone(), subscription));
            }
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Live watchlist updates unavailable");
            }
        }

        tracing::info!(
            identity = %identity,
            entries = state.watchlist.len(),
            migrated = matches!(outcome, MigrationOutcome::Migrated(_)),
            "Watchlist synced to account"
        );
    }

    /// Replaces the in-memory watchlist with pushed snapshots
    ///
    /// Snapshots arriving while our own writes are still queued are
    /// skipped: they predate the in-memory view, and the queued writes
    /// replace the remote document anyway.
    fn spawn_push_listener(&self, identity: Identity, mut subscription: Subscription) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let expected = Phase::Synced(identity.clone());

        tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let Some(strong) = inner.upgrade() else {
                    break;
                };
                let mut state = strong.state.write().await;
                if state.phase != expected {
                    break;
                }
                if strong.remote.has_pending_writes() {
                    tracing::debug!(identity = %identity, "Skipping pushed watchlist behind queued writes");
                    continue;
                }
                tracing::debug!(identity = %identity, entries = snapshot.len(), "Applying pushed watchlist");
                state.watchlist = snapshot;
            }
        })
    }

    async fn mutate(
        &self,
        operation: &'static str,
        id: EntryId,
        apply: impl FnOnce(&mut Watchlist) -> bool,
    ) -> bool {
        let mut state = self.inner.state.write().await;
        if !apply(&mut state.watchlist) {
            tracing::debug!(operation = operation, id = id, "Watchlist unchanged");
            return false;
        }

        state.store.persist(state.watchlist.entries());
        tracing::debug!(
            operation = operation,
            id = id,
            mode = ?state.store.mode(),
            "Watchlist updated"
        );
        true
    }

    /// Adds a title unless it is already tracked; returns whether it was added
    pub async fn add(&self, draft: EntryDraft, status: WatchStatus) -> bool {
        let id = draft.id;
        self.mutate("add", id, |list| list.add(draft, status, timestamp_now()))
            .await
    }

    pub async fn remove(&self, id: EntryId) -> bool {
        self.mutate("remove", id, |list| list.remove(id)).await
    }

    pub async fn set_status(&self, id: EntryId, status: WatchStatus) -> bool {
        self.mutate("set_status", id, |list| list.set_status(id, status))
            .await
    }

    pub async fn set_rating(&self, id: EntryId, rating: Rating) -> bool {
        self.mutate("set_rating", id, |list| list.set_rating(id, rating, timestamp_now()))
            .await
    }

    pub async fn set_notes(&self, id: EntryId, notes: String) -> bool {
        self.mutate("set_notes", id, |list| list.set_notes(id, notes))
            .await
    }

    pub async fn entries(&self) -> Vec<WatchlistEntry> {
        self.inner.state.read().await.watchlist.entries().to_vec()
    }

    pub async fn entry(&self, id: EntryId) -> Option<WatchlistEntry> {
        self.inner.state.read().await.watchlist.get(id).cloned()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.state.read().await.phase.clone()
    }

    pub async fn view(&self) -> WatchlistView {
        let state = self.inner.state.read().await;
        WatchlistView {
            mode: state.store.mode(),
            phase: state.phase.name(),
            identity: state.phase.identity().cloned(),
            items: state.watchlist.entries().to_vec(),
        }
    }

    /// Status of background account writes
    pub fn sync_status(&self) -> SyncStatus {
        self.inner.remote.status()
    }

    /// Waits for queued account writes; mostly useful before shutdown and in tests
    pub async fn flush(&self) {
        self.inner.remote.flush().await;
    }
}

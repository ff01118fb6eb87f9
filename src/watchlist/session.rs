use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::models::Identity;

/// Authentication state as seen by the watchlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum AuthState {
    /// Identity not resolved yet
    Resolving,
    SignedOut,
    SignedIn(Identity),
}

/// Session-scoped holder of the current identity
///
/// Cloning shares the session. Observers get every change through
/// [`AuthSession::watch`]; rapid changes coalesce to the latest state.
#[derive(Clone)]
pub struct AuthSession {
    state_tx: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(AuthState::Resolving);
        Self {
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!(identity = %identity, "Signed in");
        self.state_tx.send_replace(AuthState::SignedIn(identity));
    }

    pub fn sign_out(&self) {
        tracing::info!("Signed out");
        self.state_tx.send_replace(AuthState::SignedOut);
    }

    pub fn current(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        match self.current() {
            AuthState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_resolving() {
        let session = AuthSession::new();
        assert_eq!(session.current(), AuthState::Resolving);
        assert_eq!(session.identity(), None);
    }

    #[tokio::test]
    async fn test_watchers_see_latest_state() {
        let session = AuthSession::new();
        let mut watcher = session.watch();

        session.sign_in(Identity::new("uid-1").unwrap());
        session.sign_out();
        session.sign_in(Identity::new("uid-2").unwrap());

        watcher.changed().await.unwrap();
        assert_eq!(
            *watcher.borrow_and_update(),
            AuthState::SignedIn(Identity::new("uid-2").unwrap())
        );
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(AuthState::SignedIn(Identity::new("uid-1").unwrap())).unwrap();
        assert_eq!(json["state"], "signed_in");
        assert_eq!(json["identity"], "uid-1");
    }
}

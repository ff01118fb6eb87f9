use axum::{extract::State, Json};
use serde::Serialize;

use crate::{db::SyncStatus, models::Identity, watchlist::StoreMode};

use super::SharedState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub initialized: bool,
    pub phase: &'static str,
    pub identity: Option<Identity>,
    pub mode: StoreMode,
    pub sync: SyncStatus,
}

/// Connectivity and sync health for the client's status badge
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let view = state.reconciler.view().await;

    Json(StatusResponse {
        connected: state.monitor.is_connected(),
        initialized: state.monitor.is_initialized(),
        phase: view.phase,
        identity: view.identity,
        mode: view.mode,
        sync: state.reconciler.sync_status(),
    })
}

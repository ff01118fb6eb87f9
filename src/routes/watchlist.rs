use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{EntryDraft, EntryId, Rating, WatchStatus, WatchlistEntry},
    watchlist::WatchlistView,
};

use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    #[serde(flatten)]
    pub draft: EntryDraft,
    #[serde(default)]
    pub status: Option<WatchStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: WatchStatus,
}

#[derive(Debug, Deserialize)]
pub struct RatingUpdate {
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct NotesUpdate {
    pub notes: String,
}

fn not_tracked(id: EntryId) -> AppError {
    AppError::NotFound(format!("Title {} is not in the watchlist", id))
}

async fn current_entry(state: &SharedState, id: EntryId) -> AppResult<Json<WatchlistEntry>> {
    state
        .reconciler
        .entry(id)
        .await
        .map(Json)
        .ok_or_else(|| not_tracked(id))
}

pub async fn list(State(state): State<SharedState>) -> Json<WatchlistView> {
    Json(state.reconciler.view().await)
}

/// 201 with the new entry, or 200 with the existing one for a duplicate
pub async fn add(
    State(state): State<SharedState>,
    Json(request): Json<AddEntryRequest>,
) -> AppResult<(StatusCode, Json<WatchlistEntry>)> {
    if request.draft.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }

    let id = request.draft.id;
    let added = state
        .reconciler
        .add(request.draft, request.status.unwrap_or_default())
        .await;
    let entry = current_entry(&state, id).await?;

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, entry))
}

pub async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<EntryId>,
) -> AppResult<StatusCode> {
    if state.reconciler.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_tracked(id))
    }
}

pub async fn set_status(
    State(state): State<SharedState>,
    Path(id): Path<EntryId>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<WatchlistEntry>> {
    if !state.reconciler.set_status(id, update.status).await {
        return Err(not_tracked(id));
    }
    current_entry(&state, id).await
}

pub async fn set_rating(
    State(state): State<SharedState>,
    Path(id): Path<EntryId>,
    Json(update): Json<RatingUpdate>,
) -> AppResult<Json<WatchlistEntry>> {
    let rating =
        Rating::try_from(update.rating).map_err(|e| AppError::InvalidInput(e.to_string()))?;

    if !state.reconciler.set_rating(id, rating).await {
        return Err(not_tracked(id));
    }
    current_entry(&state, id).await
}

pub async fn set_notes(
    State(state): State<SharedState>,
    Path(id): Path<EntryId>,
    Json(update): Json<NotesUpdate>,
) -> AppResult<Json<WatchlistEntry>> {
    if !state.reconciler.set_notes(id, update.notes).await {
        return Err(not_tracked(id));
    }
    current_entry(&state, id).await
}

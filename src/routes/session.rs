use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::Identity,
    watchlist::WatchlistView,
};

use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub identity: String,
}

/// Signs in and answers once the watchlist has switched to the account
pub async fn sign_in(
    State(state): State<SharedState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<Json<WatchlistView>> {
    let identity = Identity::new(request.identity)
        .ok_or_else(|| AppError::InvalidInput("Identity is required".to_string()))?;

    state.session.sign_in(identity);
    // The attached session listener applies the same change; whichever
    // runs second finds the phase already current and returns
    state.reconciler.apply_auth(state.session.current()).await;
    Ok(Json(state.reconciler.view().await))
}

pub async fn sign_out(State(state): State<SharedState>) -> Json<WatchlistView> {
    state.session.sign_out();
    // Settled here too so the response reflects the new phase
    state.reconciler.apply_auth(state.session.current()).await;
    Json(state.reconciler.view().await)
}

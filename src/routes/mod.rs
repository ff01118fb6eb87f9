use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_request_span, tag_request},
    services::{CatalogService, ConnectionMonitor},
    watchlist::{AuthSession, Reconciler},
};

pub mod catalog;
pub mod session;
pub mod status;
pub mod watchlist;

/// Everything handlers need, shared behind an `Arc`
pub struct AppState {
    pub catalog: CatalogService,
    pub reconciler: Reconciler,
    pub session: AuthSession,
    pub monitor: ConnectionMonitor,
}

pub type SharedState = Arc<AppState>;

/// Creates the application router with all routes
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(catalog_routes())
        .merge(watchlist_routes())
        .route("/session", put(session::sign_in).delete(session::sign_out))
        .route("/status", get(status::status))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(tag_request))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn catalog_routes() -> Router<SharedState> {
    Router::new()
        .route("/search", get(catalog::search))
        .route("/trending", get(catalog::trending))
        .route("/recent", get(catalog::recent))
        .route("/discover", get(catalog::discover))
        .route("/details", get(catalog::details))
}

fn watchlist_routes() -> Router<SharedState> {
    Router::new()
        .route("/watchlist", get(watchlist::list).post(watchlist::add))
        .route("/watchlist/:id", axum::routing::delete(watchlist::remove))
        .route("/watchlist/:id/status", put(watchlist::set_status))
        .route("/watchlist/:id/rating", put(watchlist::set_rating))
        .route("/watchlist/:id/notes", put(watchlist::set_notes))
}

/// Liveness endpoint, also the default target of the connection monitor
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

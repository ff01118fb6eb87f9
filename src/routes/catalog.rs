use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogPage, CatalogScope, DiscoverFilters, MediaKind, TimeWindow},
};

use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    window: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn page(results: Vec<CatalogItem>) -> Json<CatalogPage> {
    Json(CatalogPage { results })
}

pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<CatalogPage>> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Query required".to_string()))?;

    Ok(page(state.catalog.search(&query).await))
}

/// Unknown `type` values answer with an empty listing
pub async fn trending(
    State(state): State<SharedState>,
    Query(params): Query<ListingQuery>,
) -> Json<CatalogPage> {
    let scope = match params.kind.as_deref() {
        None | Some("") => CatalogScope::All,
        Some(kind) => match kind.parse::<CatalogScope>() {
            Ok(scope) => scope,
            Err(e) => {
                tracing::debug!(error = %e, "Unknown trending type");
                return page(Vec::new());
            }
        },
    };
    let window = match params.window.as_deref() {
        Some("day") => TimeWindow::Day,
        _ => TimeWindow::Week,
    };

    page(state.catalog.trending(scope, window).await)
}

/// `movie` or `tv`; anything else is the mixed listing
pub async fn recent(
    State(state): State<SharedState>,
    Query(params): Query<ListingQuery>,
) -> Json<CatalogPage> {
    let scope = params
        .kind
        .as_deref()
        .and_then(|kind| kind.parse::<MediaKind>().ok())
        .map(CatalogScope::Only)
        .unwrap_or_default();

    page(state.catalog.recent(scope).await)
}

pub async fn discover(
    State(state): State<SharedState>,
    Query(filters): Query<DiscoverFilters>,
) -> Json<CatalogPage> {
    page(state.catalog.discover(&filters).await)
}

pub async fn details(
    State(state): State<SharedState>,
    Query(params): Query<DetailsQuery>,
) -> AppResult<Json<CatalogItem>> {
    let id = params
        .id
        .as_deref()
        .and_then(|id| id.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidInput("ID is required".to_string()))?;
    let kind = match params.kind.as_deref() {
        Some("tv") => MediaKind::Tv,
        _ => MediaKind::Movie,
    };

    state
        .catalog
        .details(id, kind)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))
}

use std::sync::Arc;

use crate::{
    models::{CatalogItem, CatalogScope, DiscoverFilters, MediaKind, TimeWindow},
    services::providers::CatalogProvider,
};

/// Upper bound on merged movie + series listings
pub const MIXED_LIMIT: usize = 20;

/// Catalog facade used by the HTTP layer
///
/// Upstream failures never propagate from here: they are logged and the
/// caller sees an empty listing or a missing title.
#[derive(Clone)]
pub struct CatalogService {
    provider: Arc<dyn CatalogProvider>,
}

impl CatalogService {
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self { provider }
    }

    pub async fn search(&self, query: &str) -> Vec<CatalogItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.provider.search(query).await.unwrap_or_else(|e| {
            tracing::error!(query = %query, error = %e, "Catalog search failed");
            Vec::new()
        })
    }

    pub async fn trending(&self, scope: CatalogScope, window: TimeWindow) -> Vec<CatalogItem> {
        self.provider
            .trending(scope, window)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(scope = scope.as_str(), error = %e, "Trending fetch failed");
                Vec::new()
            })
    }

    /// Recent releases; `All` merges both kinds newest first
    ///
    /// A failing half of the mixed listing only drops that half.
    pub async fn recent(&self, scope: CatalogScope) -> Vec<CatalogItem> {
        match scope {
            CatalogScope::Only(kind) => self.recent_kind(kind).await,
            CatalogScope::All => {
                let (movies, tv) = futures::join!(
                    self.recent_kind(MediaKind::Movie),
                    self.recent_kind(MediaKind::Tv)
                );
                merge_newest_first(movies, tv, MIXED_LIMIT)
            }
        }
    }

    async fn recent_kind(&self, kind: MediaKind) -> Vec<CatalogItem> {
        self.provider.recent(kind).await.unwrap_or_else(|e| {
            tracing::error!(kind = %kind, error = %e, "Recent releases fetch failed");
            Vec::new()
        })
    }

    /// Movies and series matching the filters, most popular first
    ///
    /// Either half failing empties the whole listing.
    pub async fn discover(&self, filters: &DiscoverFilters) -> Vec<CatalogItem> {
        let result = futures::try_join!(
            self.provider.discover(MediaKind::Movie, filters),
            self.provider.discover(MediaKind::Tv, filters)
        );

        match result {
            Ok((movies, tv)) => merge_most_popular(movies, tv, MIXED_LIMIT),
            Err(e) => {
                tracing::error!(?filters, error = %e, "Discover fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn details(&self, id: u64, kind: MediaKind) -> Option<CatalogItem> {
        self.provider.details(id, kind).await.unwrap_or_else(|e| {
            tracing::error!(id = id, kind = %kind, error = %e, "Details fetch failed");
            None
        })
    }
}

fn merge_newest_first(
    movies: Vec<CatalogItem>,
    tv: Vec<CatalogItem>,
    limit: usize,
) -> Vec<CatalogItem> {
    let mut combined: Vec<CatalogItem> = movies.into_iter().chain(tv).collect();
    // Undated items sort last
    combined.sort_by(|a, b| b.premiere().cmp(&a.premiere()));
    combined.truncate(limit);
    combined
}

fn merge_most_popular(
    movies: Vec<CatalogItem>,
    tv: Vec<CatalogItem>,
    limit: usize,
) -> Vec<CatalogItem> {
    let mut combined: Vec<CatalogItem> = movies.into_iter().chain(tv).collect();
    combined.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
    combined.truncate(limit);
    combined
}

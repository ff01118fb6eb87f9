//! Media catalog provider abstraction
//!
//! A provider maps the catalog operations the service needs (search,
//! trending, recent releases, discovery, details) onto one upstream
//! metadata API. Providers report failures as errors; degrading them to
//! empty results is the job of `CatalogService`.

use crate::{
    error::AppResult,
    models::{CatalogItem, CatalogScope, DiscoverFilters, MediaKind, TimeWindow},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for media catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Multi search across movies, series and people
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogItem>>;

    /// Trending titles for a scope and time window
    ///
    /// Items are tagged with the requested kind unless the scope is `All`,
    /// in which case the upstream tag is kept.
    async fn trending(&self, scope: CatalogScope, window: TimeWindow)
        -> AppResult<Vec<CatalogItem>>;

    /// Titles currently in theaters (movies) or on the air (series)
    async fn recent(&self, kind: MediaKind) -> AppResult<Vec<CatalogItem>>;

    /// Most popular titles of one kind matching the filters
    async fn discover(&self, kind: MediaKind, filters: &DiscoverFilters)
        -> AppResult<Vec<CatalogItem>>;

    /// Full record for one title, `None` when the catalog does not know it
    async fn details(&self, id: u64, kind: MediaKind) -> AppResult<Option<CatalogItem>>;
}

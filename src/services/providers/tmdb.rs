//! TMDB (The Movie Database) v3 provider
//!
//! Every request carries the API key and `language=en-US` as query
//! parameters. Listing endpoints answer with a `{ results: [...] }` page;
//! details endpoints answer with the bare record.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogPage, CatalogScope, DiscoverFilters, MediaKind, TimeWindow},
    services::providers::CatalogProvider,
};
use reqwest::{header::CONTENT_TYPE, Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

const LANGUAGE: &str = "en-US";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Issues a GET and decodes the JSON body
    ///
    /// Returns `Ok(None)` for 404 so details lookups can report an unknown title.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<Option<T>> {
        let response = self
            .http_client
            .get(self.endpoint(path))
            .query(&[("api_key", self.api_key.as_str()), ("language", LANGUAGE)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(path = %path, "TMDB returned 404");
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(path = %path, status = %status, body = %body, "TMDB API error");
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}",
                status
            )));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        if !is_json {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(100).collect();
            tracing::error!(path = %path, preview = %preview, "Received non-JSON response from TMDB");
            return Err(AppError::ExternalApi(
                "Received non-JSON response from TMDB API".to_string(),
            ));
        }

        let response_text = response.text().await?;
        let data = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(path = %path, error = %e, "Failed to deserialize TMDB response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })?;

        Ok(Some(data))
    }

    async fn list(
        &self,
        path: &str,
        params: &[(&str, String)],
        kind: Option<MediaKind>,
    ) -> AppResult<Vec<CatalogItem>> {
        let page: Option<CatalogPage> = self.fetch(path, params).await?;
        let items = page.map(|p| p.results).unwrap_or_default();

        Ok(match kind {
            Some(kind) => items.into_iter().map(|item| item.with_kind(kind)).collect(),
            None => items,
        })
    }
}

fn recent_path(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "/movie/now_playing",
        MediaKind::Tv => "/tv/on_the_air",
    }
}

fn trending_path(scope: CatalogScope, window: TimeWindow) -> String {
    format!("/trending/{}/{}", scope.as_str(), window.as_str())
}

fn discover_params(filters: &DiscoverFilters) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", "1".to_string()),
        ("sort_by", "popularity.desc".to_string()),
        ("include_adult", "false".to_string()),
    ];
    params.extend(filters.query_params());
    params
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("query", query.to_string()),
            ("include_adult", "false".to_string()),
            ("page", "1".to_string()),
        ];
        let results = self.list("/search/multi", &params, None).await?;

        tracing::info!(
            query = %query,
            results = results.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(results)
    }

    async fn trending(
        &self,
        scope: CatalogScope,
        window: TimeWindow,
    ) -> AppResult<Vec<CatalogItem>> {
        let kind = match scope {
            CatalogScope::All => None,
            CatalogScope::Only(kind) => Some(kind),
        };
        self.list(&trending_path(scope, window), &[], kind).await
    }

    async fn recent(&self, kind: MediaKind) -> AppResult<Vec<CatalogItem>> {
        self.list(recent_path(kind), &[("page", "1".to_string())], Some(kind))
            .await
    }

    async fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
    ) -> AppResult<Vec<CatalogItem>> {
        let path = format!("/discover/{}", kind);
        self.list(&path, &discover_params(filters), Some(kind)).await
    }

    async fn details(&self, id: u64, kind: MediaKind) -> AppResult<Option<CatalogItem>> {
        let path = format!("/{}/{}", kind, id);
        let item: Option<CatalogItem> = self.fetch(&path, &[]).await?;

        tracing::info!(
            id = id,
            kind = %kind,
            found = item.is_some(),
            provider = "tmdb",
            "Details fetched"
        );

        Ok(item.map(|item| item.with_kind(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let provider = TmdbProvider::new("key".to_string(), "http://test.local/3/".to_string());
        assert_eq!(provider.endpoint("/movie/1"), "http://test.local/3/movie/1");
    }

    #[test]
    fn test_recent_paths() {
        assert_eq!(recent_path(MediaKind::Movie), "/movie/now_playing");
        assert_eq!(recent_path(MediaKind::Tv), "/tv/on_the_air");
    }

    #[test]
    fn test_trending_path() {
        assert_eq!(
            trending_path(CatalogScope::All, TimeWindow::Week),
            "/trending/all/week"
        );
        assert_eq!(
            trending_path(CatalogScope::Only(MediaKind::Tv), TimeWindow::Day),
            "/trending/tv/day"
        );
    }

    #[test]
    fn test_discover_params_include_filters() {
        let filters = DiscoverFilters {
            genre: Some("16".to_string()),
            lang: Some("ja".to_string()),
            country: None,
        };
        let params = discover_params(&filters);
        assert!(params.contains(&("sort_by", "popularity.desc".to_string())));
        assert!(params.contains(&("with_genres", "16".to_string())));
        assert!(params.contains(&("with_original_language", "ja".to_string())));
        assert!(!params.iter().any(|(name, _)| *name == "with_origin_country"));
    }

    #[tokio::test]
    async fn test_blank_search_skips_request() {
        // Unroutable host: any request would fail
        let provider = TmdbProvider::new("key".to_string(), "http://127.0.0.1:9".to_string());
        let results = provider.search("   ").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_an_error() {
        let provider = TmdbProvider::new("key".to_string(), "http://127.0.0.1:9".to_string());
        let result = provider.recent(MediaKind::Movie).await;
        assert!(matches!(result, Err(AppError::HttpClient(_))));
    }
}

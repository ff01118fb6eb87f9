use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use cinelog_api::{
    db::{FileStorage, LocalStore, MemoryDocumentStore, RemoteStore, RemoteWriterHandle},
    error::AppResult,
    models::{CatalogItem, CatalogScope, DiscoverFilters, MediaKind, TimeWindow},
    routes::{create_router, AppState},
    services::{CatalogProvider, CatalogService, ConnectionMonitor, LivenessProbe},
    watchlist::{AuthSession, Reconciler},
};

/// Catalog with two fixed titles
struct FixedCatalog;

fn catalog_item(id: u64, title: &str, kind: MediaKind) -> CatalogItem {
    let date_field = match kind {
        MediaKind::Movie => "release_date",
        MediaKind::Tv => "first_air_date",
    };
    let mut value = json!({
        "id": id,
        "title": title,
        "popularity": 80.5,
        "vote_average": 8.4
    });
    value[date_field] = json!("2010-07-15");
    serde_json::from_value::<CatalogItem>(value)
        .unwrap()
        .with_kind(kind)
}

fn inception() -> CatalogItem {
    catalog_item(27205, "Inception", MediaKind::Movie)
}

fn sherlock() -> CatalogItem {
    catalog_item(19885, "Sherlock", MediaKind::Tv)
}

#[async_trait::async_trait]
impl CatalogProvider for FixedCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogItem>> {
        Ok([inception(), sherlock()]
            .into_iter()
            .filter(|item| {
                item.display_title()
                    .map(|title| title.to_lowercase().contains(&query.to_lowercase()))
                    .unwrap_or(false)
            })
            .collect())
    }

    async fn trending(&self, scope: CatalogScope, _: TimeWindow) -> AppResult<Vec<CatalogItem>> {
        Ok(match scope {
            CatalogScope::All => vec![inception(), sherlock()],
            CatalogScope::Only(MediaKind::Movie) => vec![inception()],
            CatalogScope::Only(MediaKind::Tv) => vec![sherlock()],
        })
    }

    async fn recent(&self, kind: MediaKind) -> AppResult<Vec<CatalogItem>> {
        Ok(match kind {
            MediaKind::Movie => vec![inception()],
            MediaKind::Tv => vec![sherlock()],
        })
    }

    async fn discover(&self, kind: MediaKind, _: &DiscoverFilters) -> AppResult<Vec<CatalogItem>> {
        self.recent(kind).await
    }

    async fn details(&self, id: u64, kind: MediaKind) -> AppResult<Option<CatalogItem>> {
        Ok(match (id, kind) {
            (27205, MediaKind::Movie) => Some(inception()),
            (19885, MediaKind::Tv) => Some(sherlock()),
            _ => None,
        })
    }
}

struct AlwaysUp;

#[async_trait::async_trait]
impl LivenessProbe for AlwaysUp {
    async fn check(&self) -> bool {
        true
    }
}

struct TestApp {
    server: TestServer,
    _dir: tempfile::TempDir,
    _writer: RemoteWriterHandle,
}

async fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalStore::new(Arc::new(FileStorage::new(dir.path())));
    let (remote, writer) = RemoteStore::new(Arc::new(MemoryDocumentStore::new())).await;

    let state = Arc::new(AppState {
        catalog: CatalogService::new(Arc::new(FixedCatalog)),
        reconciler: Reconciler::new(local, remote),
        session: AuthSession::new(),
        monitor: ConnectionMonitor::new(Arc::new(AlwaysUp), Duration::from_secs(2)),
    });

    let server = tokio_test::assert_ok!(TestServer::new(create_router(state)));
    TestApp {
        server,
        _dir: dir,
        _writer: writer,
    }
}

fn inception_draft() -> Value {
    json!({
        "tmdb_id": 27205,
        "title": "Inception",
        "media_type": "movie",
        "poster_path": "/qmDpIHrmpJINaRKAfWQfftjCdyi.jpg",
        "year": "2010"
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app().await;
    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-123");
}

#[tokio::test]
async fn test_search_requires_query() {
    let app = create_test_app().await;

    let response = app.server.get("/search").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Query required" }));

    let response = app.server.get("/search?query=%20").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_returns_results() {
    let app = create_test_app().await;
    let response = app.server.get("/search?query=incep").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], 27205);
    // Upstream fields pass through untouched
    assert_eq!(results[0]["vote_average"], 8.4);
}

#[tokio::test]
async fn test_trending_by_type() {
    let app = create_test_app().await;

    let body: Value = app.server.get("/trending").await.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let body: Value = app.server.get("/trending?type=tv&window=day").await.json();
    assert_eq!(body["results"][0]["media_type"], "tv");

    let response = app.server.get("/trending?type=podcast").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "results": [] }));
}

#[tokio::test]
async fn test_recent_and_discover_merge_kinds() {
    let app = create_test_app().await;

    let body: Value = app.server.get("/recent").await.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let body: Value = app.server.get("/recent?type=movie").await.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let body: Value = app
        .server
        .get("/discover?genre=18&lang=en&country=GB")
        .await
        .json();
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_details_validation_and_lookup() {
    let app = create_test_app().await;

    for uri in ["/details", "/details?id=abc", "/details?id=0"] {
        let response = app.server.get(uri).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "ID is required" }));
    }

    let response = app.server.get("/details?id=27205").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Inception");

    let response = app.server.get("/details?id=19885&type=tv").await;
    response.assert_status_ok();

    let response = app.server.get("/details?id=42").await;
    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_watchlist_lifecycle() {
    let app = create_test_app().await;

    let response = app.server.post("/watchlist").json(&inception_draft()).await;
    response.assert_status(StatusCode::CREATED);
    let entry: Value = response.json();
    assert_eq!(entry["tmdb_id"], 27205);
    assert_eq!(entry["status"], "plan_to_watch");
    assert_eq!(entry["rating"], 0);
    assert_eq!(entry["notes"], "");

    // Duplicate add keeps the existing entry
    let mut duplicate = inception_draft();
    duplicate["status"] = json!("completed");
    let response = app.server.post("/watchlist").json(&duplicate).await;
    response.assert_status_ok();
    let entry: Value = response.json();
    assert_eq!(entry["status"], "plan_to_watch");

    let response = app
        .server
        .put("/watchlist/27205/status")
        .json(&json!({ "status": "completed" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .put("/watchlist/27205/rating")
        .json(&json!({ "rating": 4 }))
        .await;
    response.assert_status_ok();
    let entry: Value = response.json();
    assert_eq!(entry["rating"], 4);
    assert_eq!(entry["status"], "completed");
    assert!(entry["rated_at"].is_i64());

    let response = app
        .server
        .put("/watchlist/27205/notes")
        .json(&json!({ "notes": "rewatch in IMAX" }))
        .await;
    response.assert_status_ok();

    let body: Value = app.server.get("/watchlist").await.json();
    assert_eq!(body["mode"], "guest");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["notes"], "rewatch in IMAX");

    app.server
        .delete("/watchlist/27205")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete("/watchlist/27205")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let body: Value = app.server.get("/watchlist").await.json();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rating_out_of_range_rejected() {
    let app = create_test_app().await;
    app.server.post("/watchlist").json(&inception_draft()).await;

    for rating in [6, -1] {
        let response = app
            .server
            .put("/watchlist/27205/rating")
            .json(&json!({ "rating": rating }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    let body: Value = app.server.get("/watchlist").await.json();
    assert_eq!(body["items"][0]["rating"], 0);
}

#[tokio::test]
async fn test_updates_to_untracked_titles_are_not_found() {
    let app = create_test_app().await;

    let response = app
        .server
        .put("/watchlist/1/status")
        .json(&json!({ "status": "watching" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .put("/watchlist/1/notes")
        .json(&json!({ "notes": "x" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sign_in_migrates_guest_watchlist() {
    let app = create_test_app().await;
    app.server.delete("/session").await.assert_status_ok();
    app.server
        .post("/watchlist")
        .json(&inception_draft())
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .put("/session")
        .json(&json!({ "identity": "uid-1" }))
        .await;
    response.assert_status_ok();
    let view: Value = response.json();
    assert_eq!(view["mode"], "account");
    assert_eq!(view["phase"], "synced");
    assert_eq!(view["identity"], "uid-1");
    assert_eq!(view["items"][0]["tmdb_id"], 27205);

    let status: Value = app.server.get("/status").await.json();
    assert_eq!(status["connected"], true);
    assert_eq!(status["mode"], "account");
    assert_eq!(status["sync"]["failed_writes"], 0);

    // Guest copy moved to the account, so the device list is now empty
    let view: Value = app.server.delete("/session").await.json();
    assert_eq!(view["mode"], "guest");
    assert!(view["items"].as_array().unwrap().is_empty());

    // Signing back in shows the account list again
    let view: Value = app
        .server
        .put("/session")
        .json(&json!({ "identity": "uid-1" }))
        .await
        .json();
    assert_eq!(view["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_identity_rejected() {
    let app = create_test_app().await;
    let response = app
        .server
        .put("/session")
        .json(&json!({ "identity": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Identity is required" }));
}

// tests/metrics.rs
//
// The Prometheus recorder is process-global, so everything runs in one test.
use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use it_jobs_dashboard::auth::AuthGate;
use it_jobs_dashboard::cache::FreshnessCache;
use it_jobs_dashboard::dashboard::DocumentStore;
use it_jobs_dashboard::ingest::providers::remoteok::RemoteOkProvider;
use it_jobs_dashboard::metrics::Metrics;
use it_jobs_dashboard::news::NewsService;
use it_jobs_dashboard::relevance::RelevanceFilter;
use it_jobs_dashboard::snapshot::SnapshotResolver;
use it_jobs_dashboard::store::{BlobStore, MemoryStore};
use it_jobs_dashboard::{router, AppState};

fn build_app(metrics: &Metrics) -> Router {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
    let cache = Arc::new(FreshnessCache::new(store.clone(), Duration::from_secs(60)));
    let documents = DocumentStore::new(store);
    let state = AppState::new(
        documents.clone(),
        SnapshotResolver::new(
            documents,
            cache.clone(),
            vec![Box::new(RemoteOkProvider::from_fixture(include_str!(
                "fixtures/remoteok.json"
            )))],
        ),
        NewsService::new(cache, Vec::new()),
        RelevanceFilter::default_seed(),
        AuthGate::new("metrics-token"),
    );
    router(state).merge(metrics.router())
}

async fn status_of(app: &Router, req: Request<Body>) -> StatusCode {
    app.clone().oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn metrics_endpoint_reports_cache_provenance_and_updates() {
    let metrics = Metrics::init(Duration::from_secs(60)).expect("recorder installs once");
    let app = build_app(&metrics);

    // miss + live fetch, then hit
    for _ in 0..2 {
        let s = status_of(&app, Request::get("/jobs").body(Body::empty()).unwrap()).await;
        assert_eq!(s, StatusCode::OK);
    }

    let rejected = Request::post("/dashboard")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"market_status":"Hot"}"#))
        .unwrap();
    assert_eq!(status_of(&app, rejected).await, StatusCode::UNAUTHORIZED);

    let accepted = Request::post("/dashboard")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer metrics-token")
        .body(Body::from(r#"{"market_status":"Hot"}"#))
        .unwrap();
    assert_eq!(status_of(&app, accepted).await, StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "cache_ttl_seconds",
        "cache_misses_total",
        "cache_hits_total",
        "jobs_resolved_total{provenance=\"live_fetch\"}",
        "jobs_resolved_total{provenance=\"local_cache\"}",
        "ingest_records_total",
        "dashboard_update_rejections_total{reason=\"unauthorized\"}",
        "dashboard_updates_total",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}

//! HTTP surface: jobs, news, the dashboard document, health, and the static UI.
//!
//! The legacy `/api/*.py` paths stay routed to the same handlers so the
//! existing frontend keeps working unchanged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::{self, Body},
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::auth::AuthGate;
use crate::cache::FreshnessCache;
use crate::config::AppConfig;
use crate::dashboard::merge::merge;
use crate::dashboard::validate::{parse_payload, ValidationError};
use crate::dashboard::{format_ts, DashboardDocument, DocumentStore};
use crate::ingest::providers::{default_job_providers, default_news_providers, http_client};
use crate::ingest::types::JobRecord;
use crate::listing::{paginate, parse_page, total_pages, JobFilter, JobStats, PAGE_SIZE};
use crate::news::{NewsResponse, NewsService};
use crate::relevance::RelevanceFilter;
use crate::snapshot::{Provenance, SnapshotResolver};
use crate::store::{BlobStore, FileStore, StoreError};

/// Largest accepted `POST /dashboard` body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

#[derive(Clone)]
pub struct AppState {
    documents: DocumentStore,
    resolver: Arc<SnapshotResolver>,
    news: Arc<NewsService>,
    relevance: Arc<RelevanceFilter>,
    auth: AuthGate,
    static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        documents: DocumentStore,
        resolver: SnapshotResolver,
        news: NewsService,
        relevance: RelevanceFilter,
        auth: AuthGate,
    ) -> Self {
        Self {
            documents,
            resolver: Arc::new(resolver),
            news: Arc::new(news),
            relevance: Arc::new(relevance),
            auth,
            static_dir: None,
        }
    }

    /// Serve files from `dir` for any path no API route claims.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Production wiring: on-disk storage under `DATA_DIR`, live upstreams.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn BlobStore> = Arc::new(
            FileStore::new(cfg.data_dir.clone())
                .with_context(|| format!("creating data dir {}", cfg.data_dir.display()))?,
        );
        let cache = Arc::new(FreshnessCache::new(store.clone(), cfg.cache_ttl));
        let documents = DocumentStore::new(store);

        let resolver = SnapshotResolver::new(
            documents.clone(),
            cache.clone(),
            default_job_providers(http_client(cfg.job_fetch_timeout)?),
        )
        .with_snapshot_max_age(cfg.snapshot_max_age);
        let news = NewsService::new(cache, default_news_providers(http_client(cfg.rss_fetch_timeout)?));

        Ok(Self::new(
            documents,
            resolver,
            news,
            RelevanceFilter::load(&cfg.relevance_config_path),
            AuthGate::new(cfg.update_token.clone()),
        )
        .with_static_dir(cfg.static_dir.clone()))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let static_dir = state.static_dir.clone();

    let api = Router::new()
        .route("/health", get(health))
        .route("/jobs", get(get_jobs))
        .route("/news", get(get_news))
        .route("/dashboard", get(get_dashboard).post(post_dashboard))
        .route("/api/jobs.py", get(get_jobs))
        .route("/api/news.py", get(get_news))
        .route("/api/update.py", get(get_dashboard).post(post_dashboard))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };
    app.layer(cors)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: invalid or missing Bearer token")]
    Unauthorized,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Dashboard data file error: {0}")]
    Persist(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::PayloadTooLarge => "too_large",
            ApiError::Invalid(_) => "invalid",
            ApiError::Persist(_) => "persist",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "ok": false, "error": self.to_string() });
        match &self {
            ApiError::Unauthorized => {
                body["hint"] = json!("Set Authorization: Bearer <DASHBOARD_UPDATE_TOKEN> header");
            }
            ApiError::Invalid(e) => {
                if let Some(field) = e.field() {
                    body["field"] = json!(field);
                }
            }
            _ => {}
        }
        (self.status(), Json(body)).into_response()
    }
}

/* ----------------------------
Handlers
---------------------------- */

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "ts": format_ts(Utc::now()) }))
}

#[derive(Debug, Default, Deserialize)]
struct JobsQuery {
    query: Option<String>,
    location: Option<String>,
    #[serde(rename = "type")]
    job_type: Option<String>,
    page: Option<String>,
    force: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ForceQuery {
    force: Option<String>,
}

fn is_forced(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1" | "true"))
}

#[derive(Debug, Serialize)]
struct JobsResponse {
    jobs: Vec<JobRecord>,
    total: usize,
    page: usize,
    page_size: usize,
    total_pages: usize,
    #[serde(flatten)]
    stats: JobStats,
    from_cache: bool,
    from_snapshot: bool,
    data_source: &'static str,
    fetched_at: String,
}

async fn get_jobs(State(state): State<AppState>, Query(q): Query<JobsQuery>) -> Json<JobsResponse> {
    let resolved = state
        .resolver
        .resolve_jobs(is_forced(q.force.as_deref()))
        .await;

    let filter = JobFilter::new(
        q.query.as_deref().unwrap_or_default(),
        q.location.as_deref().unwrap_or_default(),
        q.job_type.as_deref().unwrap_or_default(),
    );
    let filtered = filter.apply(state.relevance.retain(resolved.jobs));
    let page = parse_page(q.page.as_deref());

    Json(JobsResponse {
        jobs: paginate(&filtered, page).to_vec(),
        total: filtered.len(),
        page,
        page_size: PAGE_SIZE,
        total_pages: total_pages(filtered.len()),
        stats: JobStats::from_jobs(&filtered),
        from_cache: resolved.provenance == Provenance::LocalCache,
        from_snapshot: resolved.provenance == Provenance::ExternalSnapshot,
        data_source: resolved.provenance.as_str(),
        fetched_at: resolved.fetched_at,
    })
}

async fn get_news(State(state): State<AppState>, Query(q): Query<ForceQuery>) -> Json<NewsResponse> {
    Json(state.news.get_news(is_forced(q.force.as_deref())).await)
}

#[derive(Debug, Serialize)]
struct DashboardView {
    ok: bool,
    data: DashboardDocument,
    age_seconds: Option<i64>,
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    let now = Utc::now();
    let data = state.documents.load_at(now);
    Json(DashboardView {
        ok: true,
        age_seconds: data.age_seconds(now),
        data,
    })
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    ok: bool,
    message: &'static str,
    timestamp: Option<String>,
    kpi_count: usize,
    alert_count: usize,
    insight_count: usize,
    jobs_count: usize,
}

async fn post_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UpdateResponse>, ApiError> {
    let result = apply_update(&state, &headers, body).await;
    if let Err(e) = &result {
        warn!(target: "api", reason = e.reason(), error = %e, "dashboard update rejected");
        counter!("dashboard_update_rejections_total", "reason" => e.reason()).increment(1);
    }
    result.map(Json)
}

async fn apply_update(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<UpdateResponse, ApiError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !state.auth.authorized(auth) {
        return Err(ApiError::Unauthorized);
    }

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|n| n > MAX_BODY_BYTES as u64) {
        return Err(ApiError::PayloadTooLarge);
    }
    let bytes = body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    let payload = parse_payload(&bytes)?;

    let now = Utc::now();
    let current = state.documents.load_for_update(now)?;
    let updated = merge(&current, &payload, now);
    state.documents.save(&updated)?;

    let jobs_count = match &payload.jobs_snapshot {
        Some(_) => updated.jobs_snapshot.as_ref().map_or(0, |s| s.total),
        None => 0,
    };
    counter!("dashboard_updates_total").increment(1);
    info!(
        target: "dashboard",
        source = updated.meta.update_source.as_deref().unwrap_or_default(),
        jobs_count,
        "dashboard data updated"
    );

    Ok(UpdateResponse {
        ok: true,
        message: "Dashboard data updated successfully",
        timestamp: updated.meta.last_updated.clone(),
        kpi_count: payload.kpi_updates.as_ref().map_or(0, |k| k.len()),
        alert_count: payload.trend_alerts.as_ref().map_or(0, Vec::len),
        insight_count: payload.new_insights.as_ref().map_or(0, Vec::len),
        jobs_count,
    })
}

//! IT Jobs Dashboard: binary entrypoint.
//! Boots the Axum HTTP server: config from env, tracing, Prometheus, routes.

use it_jobs_dashboard::metrics::Metrics;
use it_jobs_dashboard::{app, init_tracing, AppConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Loads .env as well; fails here when DASHBOARD_REQUIRE_TOKEN=1 and no token is set.
    let cfg = AppConfig::from_env()?;

    init_tracing(cfg.log_format);
    tracing::info!(config = ?cfg, "starting it-jobs-dashboard");

    let metrics = Metrics::init(cfg.cache_ttl)?;
    let router = app(&cfg)?.merge(metrics.router());

    Ok(router.into())
}

// src/lib.rs
// Public library surface for the server binary, the push tool and integration tests.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod hunter;
pub mod ingest;
pub mod listing;
pub mod metrics;
pub mod news;
pub mod relevance;
pub mod snapshot;
pub mod store;

pub use crate::api::{router, AppState};
pub use crate::config::{AppConfig, LogFormat};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. A subscriber installed earlier (for example
/// by the hosting runtime) wins; this is then a no-op.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("it_jobs_dashboard=info,warn"));

    let res = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init(),
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Full production router from `cfg`, without the `/metrics` endpoint.
pub fn app(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    if cfg.token_is_fallback {
        tracing::warn!(
            "DASHBOARD_UPDATE_TOKEN is not set; the built-in fallback token is accepted. \
             Set it (or DASHBOARD_REQUIRE_TOKEN=1) in production"
        );
    }
    let state = AppState::from_config(cfg)?;
    Ok(router(state))
}
